// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{ExtractionResult, Quality};
use crate::extraction::context::PageContext;
use crate::utils::errors::ExtractError;
use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};

/// 提取策略特质
///
/// 每个策略独立地把页面内容解析为部分结构化结果并给出质量信号。
/// 策略之间没有耦合，链按声明的优先级顺序驱动它们。
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// 策略标识
    fn name(&self) -> &'static str;

    /// 该策略是否适用于此页面
    fn matches(&self, ctx: &PageContext) -> bool;

    /// 执行提取
    async fn extract(&self, ctx: &PageContext) -> Result<ExtractionResult, ExtractError>;
}

/// 提取策略链
///
/// 声明式的有序策略列表。依次运行直到某个策略产出 COMPLETE
/// 或链耗尽；链耗尽时保留迄今质量最高的部分结果，而不是最后
/// 一次尝试的结果。策略内部错误降级为该策略的 EMPTY，链继续。
pub struct StrategyChain {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// 运行整条链，返回最佳结果
    pub async fn run(&self, ctx: &PageContext) -> ExtractionResult {
        let mut best = ExtractionResult::empty("none");

        for strategy in &self.strategies {
            if !strategy.matches(ctx) {
                continue;
            }

            counter!("harvest_strategy_attempts_total", "strategy" => strategy.name()).increment(1);
            let result = match strategy.extract(ctx).await {
                Ok(result) => result,
                Err(e) => {
                    // An internal strategy error never aborts the chain
                    warn!(
                        url = %ctx.candidate.url,
                        strategy = strategy.name(),
                        "strategy failed, degraded to empty: {}",
                        e
                    );
                    ExtractionResult::failed(strategy.name(), e.to_string())
                }
            };

            debug!(
                url = %ctx.candidate.url,
                strategy = strategy.name(),
                quality = ?result.quality,
                fields = result.fields.len(),
                floorplans = result.floorplans.len(),
                "strategy finished"
            );

            // Monotonic retention: a later, lower-quality result never
            // replaces an earlier, better one.
            if result.quality > best.quality {
                best = result;
            }

            if best.quality == Quality::Complete {
                counter!("harvest_strategy_success_total", "strategy" => best.strategy).increment(1);
                break;
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CandidateItem, FieldName, RecordKind};
    use crate::engines::RenderedPage;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn context() -> PageContext {
        PageContext::new(
            RecordKind::Accident,
            CandidateItem::new("http://example.com/a", "title", "src"),
            RenderedPage {
                final_url: "http://example.com/a".to_string(),
                html: "<html></html>".to_string(),
                status: 200,
                observed_responses: Vec::new(),
                elapsed: Duration::from_millis(1),
            },
        )
    }

    /// 返回固定结果的测试策略
    struct FixedStrategy {
        name: &'static str,
        outcome: Result<ExtractionResult, &'static str>,
        invoked: AtomicBool,
    }

    impl FixedStrategy {
        fn ok(name: &'static str, result: ExtractionResult) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome: Ok(result),
                invoked: AtomicBool::new(false),
            })
        }

        fn failing(name: &'static str, error: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome: Err(error),
                invoked: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl ExtractionStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn matches(&self, _ctx: &PageContext) -> bool {
            true
        }

        async fn extract(&self, _ctx: &PageContext) -> Result<ExtractionResult, ExtractError> {
            self.invoked.store(true, Ordering::SeqCst);
            match &self.outcome {
                Ok(result) => Ok(result.clone()),
                Err(msg) => Err(ExtractError::Other(msg.to_string())),
            }
        }
    }

    fn partial(name: &'static str) -> ExtractionResult {
        let mut fields = HashMap::new();
        fields.insert(FieldName::Location, "Highway 17".to_string());
        ExtractionResult::graded(name, RecordKind::Accident, fields, Vec::new())
    }

    fn complete(name: &'static str) -> ExtractionResult {
        let mut fields = HashMap::new();
        fields.insert(FieldName::ArticleText, "a".repeat(120));
        ExtractionResult::graded(name, RecordKind::Accident, fields, Vec::new())
    }

    #[tokio::test]
    async fn test_failing_strategy_does_not_abort_chain() {
        let a = FixedStrategy::failing("a", "boom");
        let b = FixedStrategy::ok("b", partial("b"));
        let chain = StrategyChain::new(vec![a, b.clone()]);

        let result = chain.run(&context()).await;
        assert_eq!(result.quality, Quality::Partial);
        assert_eq!(result.strategy, "b");
    }

    #[tokio::test]
    async fn test_early_exit_on_complete() {
        let a = FixedStrategy::ok("a", complete("a"));
        let later = FixedStrategy::ok("later", partial("later"));
        let chain = StrategyChain::new(vec![a, later.clone()]);

        let result = chain.run(&context()).await;
        assert_eq!(result.quality, Quality::Complete);
        assert_eq!(result.strategy, "a");
        assert!(!later.invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_monotonic_retention_keeps_best_partial() {
        let a = FixedStrategy::ok("a", partial("a"));
        let b = FixedStrategy::ok("b", ExtractionResult::empty("b"));
        let chain = StrategyChain::new(vec![a, b]);

        let result = chain.run(&context()).await;
        // A later EMPTY must not replace the earlier PARTIAL
        assert_eq!(result.quality, Quality::Partial);
        assert_eq!(result.strategy, "a");
    }

    #[tokio::test]
    async fn test_exhausted_chain_returns_empty() {
        let a = FixedStrategy::failing("a", "x");
        let b = FixedStrategy::failing("b", "y");
        let chain = StrategyChain::new(vec![a, b]);

        let result = chain.run(&context()).await;
        assert_eq!(result.quality, Quality::Empty);
    }
}
