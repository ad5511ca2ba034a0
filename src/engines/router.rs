// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, RenderedPage};
use crate::utils::retry_policy::RetryPolicy;
use std::sync::Arc;
use tracing::{info, warn};

/// 引擎路由器
///
/// 按支持分数降序依次尝试引擎；单个引擎内对可重试错误
/// 执行有界退避重试，不可重试错误立即换下一个引擎
pub struct EngineRouter {
    engines: Vec<Arc<dyn FetchEngine>>,
    retry_policy: RetryPolicy,
}

impl EngineRouter {
    pub fn new(engines: Vec<Arc<dyn FetchEngine>>, retry_policy: RetryPolicy) -> Self {
        Self {
            engines,
            retry_policy,
        }
    }

    /// 选择支持该请求的引擎，按支持分数降序
    fn select_engines(&self, request: &FetchRequest) -> Vec<(u8, Arc<dyn FetchEngine>)> {
        let mut candidates: Vec<(u8, Arc<dyn FetchEngine>)> = self
            .engines
            .iter()
            .map(|engine| (engine.support_score(request), engine.clone()))
            .filter(|(score, _)| *score > 0)
            .collect();
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates
    }

    /// 路由请求到合适的引擎
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(RenderedPage)` - 渲染后的页面
    /// * `Err(EngineError)` - 所有引擎均失败
    pub async fn route(&self, request: &FetchRequest) -> Result<RenderedPage, EngineError> {
        let candidates = self.select_engines(request);
        if candidates.is_empty() {
            warn!(url = %request.url, "No suitable engines available for request");
            return Err(EngineError::AllEnginesFailed);
        }

        let mut last_error = None;

        for (score, engine) in candidates {
            let engine_name = engine.name();
            info!(url = %request.url, engine = engine_name, score, "trying engine");

            let mut attempt = 0u32;
            loop {
                match engine.fetch(request).await {
                    Ok(page) => {
                        info!(
                            url = %request.url,
                            engine = engine_name,
                            elapsed_ms = page.elapsed.as_millis() as u64,
                            "engine succeeded"
                        );
                        return Ok(page);
                    }
                    Err(e) if e.is_retryable() && self.retry_policy.should_retry(attempt) => {
                        let backoff = self.retry_policy.calculate_backoff(attempt);
                        warn!(
                            url = %request.url,
                            engine = engine_name,
                            attempt,
                            backoff_ms = backoff.as_millis() as u64,
                            "retryable fetch error: {}",
                            e
                        );
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                    }
                    Err(e) if e.is_retryable() => {
                        warn!(
                            url = %request.url,
                            engine = engine_name,
                            "engine exhausted retries: {}, trying next engine",
                            e
                        );
                        last_error = Some(e);
                        break;
                    }
                    Err(e) => {
                        warn!(
                            url = %request.url,
                            engine = engine_name,
                            "non-retryable fetch error: {}, trying next engine",
                            e
                        );
                        last_error = Some(e);
                        break;
                    }
                }
            }
        }

        warn!(url = %request.url, "all engines failed");
        Err(last_error.unwrap_or(EngineError::AllEnginesFailed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::traits::{ObservedResponse, RenderedPage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn page(html: &str) -> RenderedPage {
        RenderedPage {
            final_url: "http://example.com".to_string(),
            html: html.to_string(),
            status: 200,
            observed_responses: Vec::<ObservedResponse>::new(),
            elapsed: Duration::from_millis(5),
        }
    }

    /// 可编程的测试引擎：前 N 次调用失败，之后成功
    struct FlakyEngine {
        name: &'static str,
        score: u8,
        failures_before_success: u32,
        calls: AtomicU32,
        retryable: bool,
    }

    #[async_trait]
    impl FetchEngine for FlakyEngine {
        async fn fetch(&self, _request: &FetchRequest) -> Result<RenderedPage, EngineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                if self.retryable {
                    Err(EngineError::Timeout)
                } else {
                    Err(EngineError::Other("broken".to_string()))
                }
            } else {
                Ok(page(self.name))
            }
        }

        fn support_score(&self, _request: &FetchRequest) -> u8 {
            self.score
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
            enable_jitter: false,
        }
    }

    #[tokio::test]
    async fn test_route_prefers_higher_support_score() {
        let router = EngineRouter::new(
            vec![
                Arc::new(FlakyEngine {
                    name: "slow",
                    score: 10,
                    failures_before_success: 0,
                    calls: AtomicU32::new(0),
                    retryable: true,
                }),
                Arc::new(FlakyEngine {
                    name: "fast",
                    score: 100,
                    failures_before_success: 0,
                    calls: AtomicU32::new(0),
                    retryable: true,
                }),
            ],
            fast_policy(),
        );

        let result = router.route(&FetchRequest::new("http://example.com")).await.unwrap();
        assert_eq!(result.html, "fast");
    }

    #[tokio::test]
    async fn test_route_retries_transient_errors_then_succeeds() {
        let router = EngineRouter::new(
            vec![Arc::new(FlakyEngine {
                name: "flaky",
                score: 100,
                failures_before_success: 2,
                calls: AtomicU32::new(0),
                retryable: true,
            })],
            fast_policy(),
        );

        let result = router.route(&FetchRequest::new("http://example.com")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_route_falls_through_on_non_retryable() {
        let primary = Arc::new(FlakyEngine {
            name: "primary",
            score: 100,
            failures_before_success: 10,
            calls: AtomicU32::new(0),
            retryable: false,
        });
        let router = EngineRouter::new(
            vec![
                primary.clone(),
                Arc::new(FlakyEngine {
                    name: "backup",
                    score: 50,
                    failures_before_success: 0,
                    calls: AtomicU32::new(0),
                    retryable: true,
                }),
            ],
            fast_policy(),
        );

        let result = router.route(&FetchRequest::new("http://example.com")).await.unwrap();
        assert_eq!(result.html, "backup");
        // Non-retryable errors must not be retried on the same engine
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_route_no_capable_engine() {
        let router = EngineRouter::new(
            vec![Arc::new(FlakyEngine {
                name: "http-only",
                score: 0,
                failures_before_success: 0,
                calls: AtomicU32::new(0),
                retryable: true,
            })],
            fast_policy(),
        );

        let result = router.route(&FetchRequest::rendered("http://example.com")).await;
        assert!(matches!(result, Err(EngineError::AllEnginesFailed)));
    }
}
