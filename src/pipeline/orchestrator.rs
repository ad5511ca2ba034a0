// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{
    BatchReport, CandidateItem, FieldName, ItemReport, ItemState, NormalizedValue, Quality, Record,
    RecordKind,
};
use crate::domain::repositories::record_repository::{RecordRepository, UpsertOutcome};
use crate::domain::services::dedup::SoftDeduper;
use crate::domain::services::normalizer::{self, FieldNormalizer};
use crate::domain::services::scorer::CandidateScorer;
use crate::engines::{EngineRouter, FetchRequest};
use crate::extraction::chain::StrategyChain;
use crate::extraction::context::PageContext;
use crate::extraction::summarizer::Summarizer;
use crate::utils::url_utils;
use chrono::Utc;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use metrics::{counter, histogram};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use url::Url;

/// 管道运行参数
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 批次记录域
    pub kind: RecordKind,
    /// 并发条目上限
    pub concurrency: usize,
    /// 单条目处理超时
    pub per_item_timeout: Duration,
    /// 单次抓取超时
    pub fetch_timeout: Duration,
    /// 同站连续请求间的礼貌停顿
    pub courtesy_delay: Duration,
    /// 嗅探窗口时长（毫秒）
    pub sniff_window_ms: u64,
    /// 是否允许升级到浏览器引擎重抓
    pub browser_enabled: bool,
    /// URL 规范化时剥除的跟踪参数名
    pub tracking_params: Vec<String>,
}

/// 管道编排器
///
/// 驱动 打分 -> 抓取 -> 提取 -> 规范化 -> 去重 -> 持久化 全流程。
/// 条目级失败被吸收为终态报告，从不中止批次；
/// 批次结束时产出按终态计数的汇总报告。
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    scorer: CandidateScorer,
    router: Arc<EngineRouter>,
    chain: Arc<StrategyChain>,
    normalizer: Arc<FieldNormalizer>,
    summarizer: Arc<dyn Summarizer>,
    deduper: Arc<SoftDeduper>,
    repository: Arc<dyn RecordRepository>,
    /// 按主机限速，保证同站请求之间的最小间隔
    limiter: Option<DefaultKeyedRateLimiter<String>>,
}

impl PipelineOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PipelineConfig,
        scorer: CandidateScorer,
        router: Arc<EngineRouter>,
        chain: Arc<StrategyChain>,
        normalizer: Arc<FieldNormalizer>,
        summarizer: Arc<dyn Summarizer>,
        deduper: Arc<SoftDeduper>,
        repository: Arc<dyn RecordRepository>,
    ) -> Self {
        let limiter = (config.courtesy_delay > Duration::ZERO)
            .then(|| Quota::with_period(config.courtesy_delay))
            .flatten()
            .map(RateLimiter::keyed);

        Self {
            config,
            scorer,
            router,
            chain,
            normalizer,
            summarizer,
            deduper,
            repository,
            limiter,
        }
    }

    /// 运行一个批次
    ///
    /// # 参数
    ///
    /// * `candidates` - 候选条目列表
    /// * `cancel` - 取消令牌，触发后未开始的条目记作 NotAttempted
    ///
    /// # 返回值
    ///
    /// 批次汇总报告
    pub async fn run(
        self: &Arc<Self>,
        candidates: Vec<CandidateItem>,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let total = candidates.len();
        counter!("harvest_items_total").increment(total as u64);
        info!(total, kind = self.config.kind.as_str(), "batch started");

        let now = Utc::now();
        let accepted = self.scorer.filter(candidates.clone(), now);
        let accepted_urls: HashSet<&str> = accepted.iter().map(|i| i.url.as_str()).collect();

        let mut reports: Vec<ItemReport> = Vec::with_capacity(total);
        for item in &candidates {
            if !accepted_urls.contains(item.url.as_str()) {
                counter!("harvest_items_rejected_total").increment(1);
                reports.push(ItemReport::new(&item.url, ItemState::Rejected));
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for item in accepted {
            let this = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            join_set.spawn(async move {
                let url = item.url.clone();

                let _permit = tokio::select! {
                    _ = cancel.cancelled() => {
                        return ItemReport::new(url, ItemState::NotAttempted);
                    }
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return ItemReport::new(url, ItemState::NotAttempted),
                    },
                };
                if cancel.is_cancelled() {
                    return ItemReport::new(url, ItemState::NotAttempted);
                }

                let started = Instant::now();
                let report = match tokio::time::timeout(
                    this.config.per_item_timeout,
                    this.process_item(item),
                )
                .await
                {
                    Ok(report) => report,
                    Err(_) => {
                        counter!("harvest_items_failed_total").increment(1);
                        ItemReport::with_cause(
                            url,
                            ItemState::Failed,
                            format!(
                                "timed out after {}s",
                                this.config.per_item_timeout.as_secs()
                            ),
                        )
                    }
                };
                histogram!("harvest_item_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                report
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!("item task panicked: {}", e),
            }
        }

        let report = BatchReport::from_items(reports);
        info!(
            total = report.total,
            persisted = report.count(ItemState::Persisted),
            skipped = report.count(ItemState::SkippedDuplicate),
            failed = report.count(ItemState::Failed),
            "batch finished"
        );
        report
    }

    /// 处理单个条目直至终态
    ///
    /// 所有失败路径都被折叠为终态报告，绝不向上冒泡
    #[instrument(skip_all, fields(url = %item.url))]
    async fn process_item(&self, item: CandidateItem) -> ItemReport {
        if let Some(limiter) = &self.limiter {
            if let Some(host) = Url::parse(&item.url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_owned))
            {
                limiter.until_key_ready(&host).await;
            }
        }

        let mut request = FetchRequest::new(&item.url);
        request.timeout = self.config.fetch_timeout;

        let page = match self.router.route(&request).await {
            Ok(page) => page,
            Err(e) => {
                counter!("harvest_items_failed_total").increment(1);
                return ItemReport::with_cause(&item.url, ItemState::FetchFailed, e.to_string());
            }
        };

        let ctx = PageContext::new(self.config.kind, item.clone(), page);
        let mut best = self.chain.run(&ctx).await;

        // 静态抓取一无所获时升级为浏览器渲染重抓，房源域同时开启嗅探窗口
        if best.quality == Quality::Empty && self.config.browser_enabled {
            let mut escalated = FetchRequest::rendered(&item.url);
            escalated.timeout = self.config.fetch_timeout;
            escalated.sniff = self.config.kind == RecordKind::Listing;
            escalated.sniff_window_ms = self.config.sniff_window_ms;

            match self.router.route(&escalated).await {
                Ok(page) => {
                    let ctx = PageContext::new(self.config.kind, item.clone(), page);
                    let result = self.chain.run(&ctx).await;
                    if result.quality > best.quality {
                        best = result;
                    }
                }
                Err(e) => {
                    warn!(url = %item.url, "rendered re-fetch failed: {}", e);
                }
            }
        }

        if best.quality == Quality::Empty {
            counter!("harvest_items_failed_total").increment(1);
            return match best.error {
                Some(cause) => {
                    ItemReport::with_cause(&item.url, ItemState::ExtractionEmpty, cause)
                }
                None => ItemReport::new(&item.url, ItemState::ExtractionEmpty),
            };
        }

        let now = Utc::now();
        let mut fields = self.normalizer.normalize(self.config.kind, &best.fields, now);
        let floorplans = self.normalizer.normalize_floorplans(&best.floorplans);

        // 摘要协作者仅在策略没有产出摘要时补位
        if !fields.contains_key(&FieldName::Summary) {
            let article = fields
                .get(&FieldName::ArticleText)
                .and_then(NormalizedValue::as_text)
                .map(str::to_owned);
            if let Some(article) = article {
                if let Some(summary) = self.summarizer.summarize(&article).await {
                    fields.insert(FieldName::Summary, NormalizedValue::Text(summary));
                }
            }
        }

        let identity_key = match url_utils::identity_key(&item.url, &self.config.tracking_params) {
            Ok(key) => key,
            Err(e) => {
                counter!("harvest_items_failed_total").increment(1);
                return ItemReport::with_cause(
                    &item.url,
                    ItemState::Failed,
                    format!("invalid url: {}", e),
                );
            }
        };

        let published_at = item
            .published_at
            .as_deref()
            .and_then(|raw| normalizer::parse_datetime(raw, now));

        let record = Record {
            identity_key,
            kind: self.config.kind,
            url: item.url.clone(),
            title: Some(item.title.clone()).filter(|t| !t.trim().is_empty()),
            source_name: Some(item.source_name.clone()).filter(|s| !s.trim().is_empty()),
            published_at,
            fields,
            floorplans,
            extracted_at: now,
        };

        if !self.deduper.admit(&record) {
            counter!("harvest_items_skipped_total").increment(1);
            return ItemReport::new(&item.url, ItemState::SkippedDuplicate);
        }

        match self.repository.upsert(&record).await {
            Ok(UpsertOutcome::Inserted) => {
                counter!("harvest_items_persisted_total").increment(1);
                info!(url = %item.url, strategy = best.strategy, "record persisted");
                ItemReport::new(&item.url, ItemState::Persisted)
            }
            Ok(UpsertOutcome::SkippedDuplicate) => {
                counter!("harvest_items_skipped_total").increment(1);
                ItemReport::new(&item.url, ItemState::SkippedDuplicate)
            }
            Err(e) => {
                counter!("harvest_items_failed_total").increment(1);
                ItemReport::with_cause(&item.url, ItemState::Failed, e.to_string())
            }
        }
    }
}
