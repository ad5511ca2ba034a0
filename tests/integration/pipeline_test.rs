// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use harvestrs::config::settings::DatabaseSettings;
use harvestrs::domain::models::{
    CandidateItem, ExtractionResult, FieldName, ItemState, RecordKind,
};
use harvestrs::domain::repositories::record_repository::RecordRepository;
use harvestrs::domain::services::dedup::SoftDeduper;
use harvestrs::domain::services::normalizer::{FieldNormalizer, NormalizerConfig};
use harvestrs::domain::services::scorer::{CandidateScorer, ScorerConfig};
use harvestrs::engines::{
    EngineError, EngineRouter, FetchEngine, FetchRequest, RenderedPage,
};
use harvestrs::extraction::{
    ExtractionStrategy, NoopSummarizer, PageContext, StrategyChain,
};
use harvestrs::infrastructure::database::{create_pool, ensure_schema};
use harvestrs::infrastructure::repositories::SqliteRecordRepository;
use harvestrs::pipeline::{PipelineConfig, PipelineOrchestrator};
use harvestrs::utils::errors::ExtractError;
use harvestrs::utils::retry_policy::RetryPolicy;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// 抓取引擎替身：URL 含 "slow" 的请求悬挂远超单条目超时
struct StubEngine;

#[async_trait]
impl FetchEngine for StubEngine {
    async fn fetch(&self, request: &FetchRequest) -> Result<RenderedPage, EngineError> {
        if request.url.contains("slow") {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        Ok(RenderedPage {
            final_url: request.url.clone(),
            html: format!("<html><body>page for {}</body></html>", request.url),
            status: 200,
            observed_responses: Vec::new(),
            elapsed: Duration::from_millis(1),
        })
    }

    fn support_score(&self, _request: &FetchRequest) -> u8 {
        100
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// 每个条目产出正文字段的替身策略
struct StubArticleStrategy;

#[async_trait]
impl ExtractionStrategy for StubArticleStrategy {
    fn name(&self) -> &'static str {
        "stub_article"
    }

    fn matches(&self, _ctx: &PageContext) -> bool {
        true
    }

    async fn extract(&self, ctx: &PageContext) -> Result<ExtractionResult, ExtractError> {
        let mut fields = HashMap::new();
        fields.insert(
            FieldName::ArticleText,
            format!("Article body extracted from {}", ctx.candidate.url),
        );
        Ok(ExtractionResult::graded(
            "stub_article",
            ctx.kind,
            fields,
            Vec::new(),
        ))
    }
}

async fn shared_repository() -> Arc<SqliteRecordRepository> {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
        connect_timeout: Some(5),
    };
    let pool = create_pool(&settings).await.unwrap();
    ensure_schema(&pool).await.unwrap();
    Arc::new(SqliteRecordRepository::new(pool, false))
}

fn orchestrator(
    repository: Arc<SqliteRecordRepository>,
    per_item_timeout: Duration,
) -> Arc<PipelineOrchestrator> {
    let router = Arc::new(EngineRouter::new(
        vec![Arc::new(StubEngine)],
        RetryPolicy::default(),
    ));
    let chain = Arc::new(StrategyChain::new(vec![Arc::new(StubArticleStrategy)]));
    let scorer = CandidateScorer::new(ScorerConfig {
        min_score: 0,
        published_within_days: None,
        ..ScorerConfig::default()
    });

    Arc::new(PipelineOrchestrator::new(
        PipelineConfig {
            kind: RecordKind::Accident,
            concurrency: 4,
            per_item_timeout,
            fetch_timeout: Duration::from_secs(5),
            courtesy_delay: Duration::ZERO,
            sniff_window_ms: 0,
            browser_enabled: false,
            tracking_params: vec!["fbclid".to_string()],
        },
        scorer,
        router,
        chain,
        Arc::new(FieldNormalizer::new(NormalizerConfig::default())),
        Arc::new(NoopSummarizer),
        Arc::new(SoftDeduper::new(0.94)),
        repository,
    ))
}

fn batch(urls: &[&str]) -> Vec<CandidateItem> {
    urls.iter()
        .enumerate()
        .map(|(i, url)| {
            CandidateItem::new(
                *url,
                format!("Crash report {} in Charleston", i),
                "live5news.com",
            )
        })
        .collect()
}

/// 同一批次重跑一遍，产出不增加
#[tokio::test]
async fn rerunning_a_batch_is_idempotent() {
    let repository = shared_repository().await;
    let cancel = CancellationToken::new();

    let urls = [
        "https://example.com/news/a",
        "https://example.com/news/b",
        "https://example.com/news/c",
    ];

    let first = orchestrator(repository.clone(), Duration::from_secs(10));
    let report = first.run(batch(&urls), &cancel).await;
    assert_eq!(report.count(ItemState::Persisted), 3);
    assert_eq!(repository.count().await.unwrap(), 3);

    // Fresh orchestrator: only the storage layer carries state across runs
    let second = orchestrator(repository.clone(), Duration::from_secs(10));
    let report = second.run(batch(&urls), &cancel).await;
    assert_eq!(report.count(ItemState::Persisted), 0);
    assert_eq!(report.count(ItemState::SkippedDuplicate), 3);
    assert_eq!(repository.count().await.unwrap(), 3);
}

/// 单个挂起条目只拖垮自己，不拖垮批次
#[tokio::test]
async fn hanging_item_times_out_without_stalling_batch() {
    let repository = shared_repository().await;
    let cancel = CancellationToken::new();
    let orchestrator = orchestrator(repository.clone(), Duration::from_millis(500));

    let urls = [
        "https://example.com/news/0",
        "https://example.com/news/1",
        "https://example.com/news/2",
        "https://example.com/news/slow",
        "https://example.com/news/4",
        "https://example.com/news/5",
        "https://example.com/news/6",
        "https://example.com/news/7",
        "https://example.com/news/8",
        "https://example.com/news/9",
    ];

    let started = Instant::now();
    let report = orchestrator.run(batch(&urls), &cancel).await;
    let elapsed = started.elapsed();

    assert_eq!(report.total, 10);
    assert_eq!(report.count(ItemState::Persisted), 9);
    assert_eq!(report.count(ItemState::Failed), 1);

    let failure = report
        .failures
        .iter()
        .find(|f| f.state == ItemState::Failed)
        .unwrap();
    assert!(failure.url.contains("slow"));
    assert!(failure.error_cause.as_deref().unwrap().contains("timed out"));

    // 批次耗时与单条目超时同量级，而不是挂起条目的睡眠时长
    assert!(elapsed < Duration::from_secs(30), "batch stalled: {:?}", elapsed);
}

#[tokio::test]
async fn cancellation_marks_remaining_items() {
    let repository = shared_repository().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let orchestrator = orchestrator(repository.clone(), Duration::from_secs(10));
    let report = orchestrator
        .run(batch(&["https://example.com/news/a"]), &cancel)
        .await;

    assert_eq!(report.count(ItemState::NotAttempted), 1);
    assert_eq!(repository.count().await.unwrap(), 0);
}
