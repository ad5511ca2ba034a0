// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::CandidateItem;
use crate::domain::services::normalizer::parse_datetime;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// 候选项打分配置
///
/// 权重与关键词列表来自配置，默认值面向 Charleston 事故新闻领域
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// 地域关键词，命中标题或来源名计 locale_weight 分
    pub locale_keywords: Vec<String>,
    /// 主题关键词，命中标题计 topic_weight 分
    pub topic_keywords: Vec<String>,
    /// 可信来源域名，命中一次性加 trusted_bonus 分
    pub trusted_sources: Vec<String>,
    /// 视频站点域名，无条件排除
    pub video_domains: Vec<String>,
    /// URL 路径中的视频指示片段，无条件排除
    pub video_indicators: Vec<String>,
    pub locale_weight: u32,
    pub topic_weight: u32,
    pub trusted_bonus: u32,
    /// 低于该分数的候选项在任何抓取前被过滤
    pub min_score: u32,
    /// 发布时间窗口（天）；None 表示不做时效过滤
    pub published_within_days: Option<i64>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            locale_keywords: vec![
                "charleston".to_string(),
                "mount pleasant".to_string(),
                "north charleston".to_string(),
                "summerville".to_string(),
                "james island".to_string(),
                "west ashley".to_string(),
                "lowcountry".to_string(),
            ],
            topic_keywords: vec![
                "accident".to_string(),
                "crash".to_string(),
                "collision".to_string(),
                "wreck".to_string(),
                "pileup".to_string(),
                "injured".to_string(),
                "fatal".to_string(),
            ],
            trusted_sources: vec![
                "live5news.com".to_string(),
                "counton2.com".to_string(),
                "abcnews4.com".to_string(),
                "postandcourier.com".to_string(),
                "wcbd.com".to_string(),
            ],
            video_domains: vec![
                "youtube.com".to_string(),
                "youtu.be".to_string(),
                "vimeo.com".to_string(),
                "tiktok.com".to_string(),
                "dailymotion.com".to_string(),
            ],
            video_indicators: vec![
                "/video/".to_string(),
                "/videos/".to_string(),
                "/watch?".to_string(),
                "/livestream".to_string(),
            ],
            locale_weight: 3,
            topic_weight: 2,
            trusted_bonus: 2,
            min_score: 3,
            published_within_days: Some(365),
        }
    }
}

/// 候选项打分器
///
/// 在任何网络抓取之前，按地域、主题、来源可信度三类独立信号加权求和，
/// 过滤掉不相关的候选项以控制抓取成本
pub struct CandidateScorer {
    config: ScorerConfig,
}

impl CandidateScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Additive relevance score. Empty title/source scores 0, never errors.
    pub fn score(&self, item: &CandidateItem) -> u32 {
        let title = item.title.to_lowercase();
        let source = item.source_name.to_lowercase();
        if title.is_empty() && source.is_empty() {
            return 0;
        }

        let mut score = 0u32;

        for keyword in &self.config.locale_keywords {
            if title.contains(keyword.as_str()) || source.contains(keyword.as_str()) {
                score += self.config.locale_weight;
            }
        }

        for keyword in &self.config.topic_keywords {
            if title.contains(keyword.as_str()) {
                score += self.config.topic_weight;
            }
        }

        // Unknown source domains simply contribute 0 to the trust term
        let url = item.url.to_lowercase();
        if self
            .config
            .trusted_sources
            .iter()
            .any(|domain| url.contains(domain.as_str()) || source.contains(domain.as_str()))
        {
            score += self.config.trusted_bonus;
        }

        score
    }

    /// 结构性排除：视频页面不含可提取正文，按域名与路径片段识别
    ///
    /// This check is unconditional and runs before any scoring.
    pub fn is_excluded_media_type(&self, url: &str) -> bool {
        let url_lower = url.to_lowercase();
        self.config
            .video_domains
            .iter()
            .any(|domain| url_lower.contains(domain.as_str()))
            || self
                .config
                .video_indicators
                .iter()
                .any(|indicator| url_lower.contains(indicator.as_str()))
    }

    /// 过滤并排序候选项：媒体类型排除 → 打分 → 时效窗口 → 稳定降序排序
    ///
    /// The sort is stable: ties keep their original order.
    pub fn filter(&self, items: Vec<CandidateItem>, now: DateTime<Utc>) -> Vec<CandidateItem> {
        let mut scored: Vec<(u32, CandidateItem)> = Vec::with_capacity(items.len());

        for item in items {
            if self.is_excluded_media_type(&item.url) {
                debug!(url = %item.url, "candidate excluded: video media type");
                continue;
            }
            let score = self.score(&item);
            if score < self.config.min_score {
                debug!(url = %item.url, score, "candidate rejected below score floor");
                continue;
            }
            if !self.is_within_window(&item, now) {
                debug!(url = %item.url, "candidate rejected outside publication window");
                continue;
            }
            scored.push((score, item));
        }

        // sort_by_key is stable, so equal scores preserve input order
        scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
        scored.into_iter().map(|(_, item)| item).collect()
    }

    fn is_within_window(&self, item: &CandidateItem, now: DateTime<Utc>) -> bool {
        let Some(days) = self.config.published_within_days else {
            return true;
        };
        match item.published_at.as_deref().and_then(|raw| parse_datetime(raw, now)) {
            Some(published) => now - published <= Duration::days(days),
            // Window filtering requires a parseable date
            None => false,
        }
    }
}
