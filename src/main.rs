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

use harvestrs::config::settings::Settings;
use harvestrs::domain::models::RecordKind;
use harvestrs::domain::services::dedup::SoftDeduper;
use harvestrs::domain::services::normalizer::{FieldNormalizer, NormalizerConfig};
use harvestrs::domain::services::scorer::{CandidateScorer, ScorerConfig};
use harvestrs::engines::{BrowserEngine, EngineRouter, FetchEngine, HttpEngine};
use harvestrs::extraction::{build_chain, NoopSummarizer};
use harvestrs::infrastructure::database::{create_pool, ensure_schema};
use harvestrs::infrastructure::observability::init_metrics;
use harvestrs::infrastructure::repositories::SqliteRecordRepository;
use harvestrs::pipeline::{CandidateSource, JsonFileSource, PipelineConfig, PipelineOrchestrator};
use harvestrs::utils::retry_policy::RetryPolicy;
use harvestrs::utils::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并运行一个批次
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting harvestrs...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // Initialize Prometheus metrics
    init_metrics(&settings.metrics);

    let kind = match settings.batch.kind.as_str() {
        "accident" => RecordKind::Accident,
        "listing" => RecordKind::Listing,
        other => anyhow::bail!("unknown batch kind: {}", other),
    };

    // 3. Connect to database and ensure schema
    let pool = create_pool(&settings.database).await?;
    ensure_schema(&pool).await?;
    info!("Database connection established");

    let repository = Arc::new(SqliteRecordRepository::new(pool, settings.batch.refresh));

    // 4. Assemble fetch engines
    let mut engines: Vec<Arc<dyn FetchEngine>> = vec![Arc::new(HttpEngine)];
    if settings.fetch.browser_enabled {
        engines.push(Arc::new(BrowserEngine::new(
            settings.fetch.blocked_domains.clone(),
        )));
    }
    let router = Arc::new(EngineRouter::new(engines, RetryPolicy::standard()));

    // 5. Assemble extraction chain and domain services
    let chain = Arc::new(build_chain(&settings.strategies, router.clone()));
    let scorer = CandidateScorer::new(ScorerConfig {
        locale_keywords: settings.scoring.locale_keywords.clone(),
        topic_keywords: settings.scoring.topic_keywords.clone(),
        trusted_sources: settings.scoring.trusted_sources.clone(),
        video_domains: settings.scoring.video_domains.clone(),
        video_indicators: settings.scoring.video_indicators.clone(),
        locale_weight: settings.scoring.locale_weight,
        topic_weight: settings.scoring.topic_weight,
        trusted_bonus: settings.scoring.trusted_bonus,
        min_score: settings.scoring.min_score,
        published_within_days: match settings.scoring.published_within_days {
            0 => None,
            days => Some(days),
        },
    });
    let normalizer = Arc::new(FieldNormalizer::new(NormalizerConfig {
        summary_max_chars: settings.normalizer.summary_max_chars,
        article_max_chars: settings.normalizer.article_max_chars,
        agency_vocabulary: settings.normalizer.agency_vocabulary.clone(),
    }));
    let deduper = Arc::new(SoftDeduper::new(settings.dedup.similarity_threshold));

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        PipelineConfig {
            kind,
            concurrency: settings.batch.concurrency,
            per_item_timeout: Duration::from_secs(settings.batch.per_item_timeout_secs),
            fetch_timeout: Duration::from_secs(settings.fetch.timeout_secs),
            courtesy_delay: Duration::from_millis(settings.fetch.courtesy_delay_ms),
            sniff_window_ms: settings.fetch.sniffer_window_ms,
            browser_enabled: settings.fetch.browser_enabled,
            tracking_params: settings.dedup.tracking_params.clone(),
        },
        scorer,
        router,
        chain,
        normalizer,
        Arc::new(NoopSummarizer),
        deduper,
        repository,
    ));

    // 6. Load candidates and run the batch
    let source = JsonFileSource::new(settings.batch.input_file.as_str());
    let candidates = source.load().await?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling batch");
            signal_cancel.cancel();
        }
    });

    let report = orchestrator.run(candidates, &cancel).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
