// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 启动时构造一次，经 `Arc` 共享穿过管线；管线中途从不临时读取环境
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 批次配置
    pub batch: BatchSettings,
    /// 打分配置
    pub scoring: ScoringSettings,
    /// 策略链配置
    pub strategies: StrategySettings,
    /// 字段规范化配置
    pub normalizer: NormalizerSettings,
    /// 去重配置
    pub dedup: DedupSettings,
    /// 抓取配置
    pub fetch: FetchSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
}

/// 批次配置设置
#[derive(Debug, Deserialize)]
pub struct BatchSettings {
    /// 记录域 (accident, listing)
    pub kind: String,
    /// 候选条目输入文件（JSON 数组）
    pub input_file: String,
    /// 并发上限
    pub concurrency: usize,
    /// 单条目超时时间（秒）
    pub per_item_timeout_secs: u64,
    /// 刷新模式：重抓已存在的记录并整行替换
    pub refresh: bool,
}

/// 打分配置设置
#[derive(Debug, Deserialize)]
pub struct ScoringSettings {
    /// 地域关键词
    pub locale_keywords: Vec<String>,
    /// 主题关键词
    pub topic_keywords: Vec<String>,
    /// 可信来源域名
    pub trusted_sources: Vec<String>,
    /// 排除的视频站点域名
    pub video_domains: Vec<String>,
    /// URL 中的视频指示片段
    pub video_indicators: Vec<String>,
    /// 地域命中权重
    pub locale_weight: u32,
    /// 主题命中权重
    pub topic_weight: u32,
    /// 可信来源加分
    pub trusted_bonus: u32,
    /// 最低分数线，低于此分不抓取
    pub min_score: u32,
    /// 发布时间窗口（天），0 表示不过滤
    pub published_within_days: i64,
}

/// 策略链配置设置
#[derive(Debug, Deserialize)]
pub struct StrategySettings {
    /// 策略优先级顺序
    pub order: Vec<String>,
    pub embedded_json: bool,
    pub sniffer: bool,
    pub article_dom: bool,
    pub listing_dom: bool,
    pub redirect: bool,
    /// 正文选择器的最小接受文本长度（字符）
    pub min_article_chars: usize,
    /// 跳转子策略的抓取超时（秒）
    pub redirect_fetch_timeout_secs: u64,
}

/// 字段规范化配置设置
#[derive(Debug, Deserialize)]
pub struct NormalizerSettings {
    /// 摘要字段截断上限（字符）
    pub summary_max_chars: usize,
    /// 正文字段截断上限（字符）
    pub article_max_chars: usize,
    /// 机构枚举词表
    pub agency_vocabulary: Vec<String>,
}

/// 去重配置设置
#[derive(Debug, Deserialize)]
pub struct DedupSettings {
    /// URL 规范化时剥除的跟踪参数名
    pub tracking_params: Vec<String>,
    /// 软去重的名称相似度阈值 (0.0-1.0)
    pub similarity_threshold: f64,
}

/// 抓取配置设置
#[derive(Debug, Deserialize)]
pub struct FetchSettings {
    /// 同站连续请求间的礼貌停顿（毫秒）
    pub courtesy_delay_ms: u64,
    /// 嗅探窗口时长（毫秒）
    pub sniffer_window_ms: u64,
    /// 是否启用浏览器引擎
    pub browser_enabled: bool,
    /// 嗅探时忽略的域名
    pub blocked_domains: Vec<String>,
    /// 单次抓取超时（秒）
    pub timeout_secs: u64,
}

/// 指标配置设置
#[derive(Debug, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出器监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从默认值、配置文件与环境变量加载配置
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Database defaults
            .set_default("database.url", "sqlite://harvest.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.connect_timeout", 10)?
            // Batch defaults
            .set_default("batch.kind", "accident")?
            .set_default("batch.input_file", "candidates.json")?
            .set_default("batch.concurrency", 4)?
            .set_default("batch.per_item_timeout_secs", 90)?
            .set_default("batch.refresh", false)?
            // Scoring defaults (Charleston accident-news domain)
            .set_default(
                "scoring.locale_keywords",
                vec![
                    "charleston",
                    "mount pleasant",
                    "north charleston",
                    "summerville",
                    "james island",
                    "west ashley",
                    "lowcountry",
                ],
            )?
            .set_default(
                "scoring.topic_keywords",
                vec!["accident", "crash", "collision", "wreck", "pileup", "injured", "fatal"],
            )?
            .set_default(
                "scoring.trusted_sources",
                vec![
                    "live5news.com",
                    "counton2.com",
                    "abcnews4.com",
                    "postandcourier.com",
                    "wcbd.com",
                ],
            )?
            .set_default(
                "scoring.video_domains",
                vec!["youtube.com", "youtu.be", "vimeo.com", "tiktok.com", "dailymotion.com"],
            )?
            .set_default(
                "scoring.video_indicators",
                vec!["/video/", "/videos/", "/watch?", "/livestream"],
            )?
            .set_default("scoring.locale_weight", 3)?
            .set_default("scoring.topic_weight", 2)?
            .set_default("scoring.trusted_bonus", 2)?
            .set_default("scoring.min_score", 3)?
            .set_default("scoring.published_within_days", 365)?
            // Strategy chain defaults
            .set_default(
                "strategies.order",
                vec!["embedded_json", "sniffer", "article_dom", "listing_dom", "redirect"],
            )?
            .set_default("strategies.embedded_json", true)?
            .set_default("strategies.sniffer", true)?
            .set_default("strategies.article_dom", true)?
            .set_default("strategies.listing_dom", true)?
            .set_default("strategies.redirect", true)?
            .set_default("strategies.min_article_chars", 50)?
            .set_default("strategies.redirect_fetch_timeout_secs", 45)?
            // Normalizer defaults
            .set_default("normalizer.summary_max_chars", 500)?
            .set_default("normalizer.article_max_chars", 20000)?
            .set_default(
                "normalizer.agency_vocabulary",
                vec![
                    "Charleston Police Department",
                    "North Charleston Police Department",
                    "Charleston County Sheriff's Office",
                    "South Carolina Highway Patrol",
                    "Mount Pleasant Police Department",
                    "Charleston Fire Department",
                    "EMS",
                ],
            )?
            // Dedup defaults
            .set_default(
                "dedup.tracking_params",
                vec!["utm_source", "utm_medium", "utm_campaign", "fbclid", "gclid", "ref", "mc_cid", "mc_eid"],
            )?
            .set_default("dedup.similarity_threshold", 0.94)?
            // Fetch defaults
            .set_default("fetch.courtesy_delay_ms", 2000)?
            .set_default("fetch.sniffer_window_ms", 3000)?
            .set_default("fetch.browser_enabled", true)?
            .set_default(
                "fetch.blocked_domains",
                vec![
                    "cdn.cookielaw.org",
                    "static.matterport.com",
                    "my.matterport.com",
                    "api-v3.peek.us",
                ],
            )?
            .set_default("fetch.timeout_secs", 30)?
            // Metrics defaults
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "127.0.0.1:9301")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("HARVEST").separator("__"));

        builder.build()?.try_deserialize()
    }
}
