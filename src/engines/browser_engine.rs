// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{
    EngineError, FetchEngine, FetchRequest, ObservedResponse, PageAction, RenderedPage,
    WaitStrategy,
};
use crate::engines::validators;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventResponseReceived, GetResponseBodyParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

// Global browser instance to avoid re-launching Chrome on every request.
static BROWSER_INSTANCE: OnceCell<Browser> = OnceCell::const_new();

// Asynchronously gets or initializes the shared browser instance.
// The browser is launched only once and reused across items.
pub async fn get_browser() -> Result<&'static Browser, EngineError> {
    BROWSER_INSTANCE
        .get_or_try_init(|| async {
            let remote_debugging_url = std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL").ok();

            let (browser, mut handler) = if let Some(ref url) = remote_debugging_url {
                tracing::info!("Connecting to remote Chrome instance at: {}", url);
                Browser::connect(url).await.map_err(|e| {
                    EngineError::Browser(format!("Failed to connect to remote Chrome: {}", e))
                })?
            } else {
                let builder = BrowserConfig::builder()
                    .no_sandbox()
                    .request_timeout(Duration::from_secs(30))
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage");

                Browser::launch(builder.build().map_err(EngineError::Browser)?)
                    .await
                    .map_err(|e| EngineError::Browser(e.to_string()))?
            };

            // Spawn a handler to process browser events
            tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            Ok(browser)
        })
        .await
}

/// 遮挡内容的弹层（cookie 同意、租赁优惠、订阅提示）关闭按钮选择器
///
/// 逐个尝试点击，找不到或点击失败一律忽略
const POPUP_DISMISS_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    ".cky-btn-accept",
    "button[aria-label='Close']",
    "button[aria-label='Dismiss']",
    "button[aria-label='close']",
    ".modal-close",
    "button.close",
    "#closeButton",
];

/// 释放守卫
///
/// `Drop` 时执行一次释放动作。页签关闭命令挂在这里，因此无论
/// 正常返回、出错还是所在 future 被超时取消，页签都会被关闭
struct ReleaseGuard<F: FnOnce()> {
    release: Option<F>,
}

impl<F: FnOnce()> ReleaseGuard<F> {
    fn new(release: F) -> Self {
        Self {
            release: Some(release),
        }
    }
}

impl<F: FnOnce()> Drop for ReleaseGuard<F> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// 浏览器引擎
///
/// 基于chromiumoxide CDP的渲染抓取引擎。支持等待策略、页面动作
/// 与有界的被动响应嗅探窗口
pub struct BrowserEngine {
    /// 嗅探时忽略的分析/广告域名
    blocked_domains: Vec<String>,
}

impl BrowserEngine {
    pub fn new(blocked_domains: Vec<String>) -> Self {
        Self { blocked_domains }
    }

    /// 关闭遮挡弹层，失败静默忽略
    async fn dismiss_popups(&self, page: &Page) {
        for selector in POPUP_DISMISS_SELECTORS {
            if let Ok(element) = page.find_element(*selector).await {
                if element.click().await.is_ok() {
                    debug!(selector, "dismissed popup");
                    tokio::time::sleep(Duration::from_millis(300)).await;
                }
            }
        }
    }

    /// 执行等待策略
    async fn apply_wait(&self, page: &Page, wait: &WaitStrategy, deadline: Instant) {
        match wait {
            WaitStrategy::None => {}
            WaitStrategy::FixedMs(ms) => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            WaitStrategy::ElementTextExceeds { selector, min_chars } => {
                // Poll until the element's rendered text crosses the threshold
                let selector_json =
                    serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
                let script = format!(
                    "(document.querySelector({})?.textContent || '').length",
                    selector_json
                );
                while Instant::now() < deadline {
                    let length = page
                        .evaluate(script.as_str())
                        .await
                        .ok()
                        .and_then(|v| v.into_value::<u64>().ok())
                        .unwrap_or(0);
                    if length as usize >= *min_chars {
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(250)).await;
                }
                warn!(selector = %selector, "element text wait expired, proceeding with current content");
            }
        }
    }

    /// 收集嗅探窗口内到达的 JSON 响应
    ///
    /// Late responses after the window closes are dropped; accepted
    /// nondeterminism of the passive side channel.
    async fn drain_observed(
        &self,
        page: &Page,
        observed: &Arc<Mutex<Vec<(String, String, String)>>>,
    ) -> Vec<ObservedResponse> {
        let entries: Vec<(String, String, String)> = observed.lock().drain(..).collect();
        let mut responses = Vec::new();

        for (request_id, url, content_type) in entries {
            if !content_type.to_lowercase().contains("json") {
                continue;
            }
            if validators::is_blocked_domain(&url, &self.blocked_domains) {
                continue;
            }
            let body = match page
                .execute(GetResponseBodyParams::new(
                    chromiumoxide::cdp::browser_protocol::network::RequestId::from(request_id),
                ))
                .await
            {
                Ok(result) => result.result.body.clone(),
                Err(e) => {
                    debug!(url = %url, "response body unavailable: {}", e);
                    continue;
                }
            };
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(body_json) => responses.push(ObservedResponse {
                    url,
                    content_type,
                    body_json,
                }),
                Err(_) => {
                    debug!(url = %url, "observed response is not valid JSON, skipped");
                }
            }
        }

        responses
    }
}

#[async_trait]
impl FetchEngine for BrowserEngine {
    /// 执行浏览器渲染抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(RenderedPage)` - 渲染后的页面
    /// * `Err(EngineError)` - 抓取过程中出现的错误
    async fn fetch(&self, request: &FetchRequest) -> Result<RenderedPage, EngineError> {
        // SSRF protection
        validators::validate_url(&request.url)
            .await
            .map_err(|e| EngineError::Other(format!("SSRF protection: {}", e)))?;

        let start = Instant::now();
        let deadline = start + request.timeout;

        // Page is a scoped acquisition: released on every exit path,
        // including cancellation of this future by the timeout below
        let result = tokio::time::timeout(request.timeout, async {
            let browser = get_browser().await?;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?;

            let close_page = page.clone();
            let _guard = ReleaseGuard::new(move || {
                tokio::spawn(async move {
                    let _ = close_page.close().await;
                });
            });

            self.fetch_on_page(&page, request, deadline, start).await
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(EngineError::Timeout),
        }
    }

    /// 计算对请求的支持分数
    ///
    /// # 返回值
    ///
    /// 支持分数（0-100）；需要JS、嗅探或页面动作的请求返回100
    fn support_score(&self, request: &FetchRequest) -> u8 {
        if request.needs_js
            || request.sniff
            || !request.actions.is_empty()
            || matches!(request.wait, WaitStrategy::ElementTextExceeds { .. })
        {
            return 100;
        }
        10 // Can do it, but expensive
    }

    /// 获取引擎名称
    fn name(&self) -> &'static str {
        "browser"
    }
}

impl BrowserEngine {
    async fn fetch_on_page(
        &self,
        page: &Page,
        request: &FetchRequest,
        deadline: Instant,
        start: Instant,
    ) -> Result<RenderedPage, EngineError> {
        // The response observer must be installed before navigation begins,
        // otherwise early XHRs fired during page load are missed.
        let observed: Arc<Mutex<Vec<(String, String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let mut listener_task = None;

        if request.sniff {
            page.execute(EnableParams::default())
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?;
            let mut events = page
                .event_listener::<EventResponseReceived>()
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?;
            let sink = observed.clone();
            listener_task = Some(tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    sink.lock().push((
                        event.request_id.inner().to_string(),
                        event.response.url.clone(),
                        event.response.mime_type.clone(),
                    ));
                }
            }));
        }

        page.goto(request.url.as_str())
            .await
            .map_err(|e| EngineError::Browser(e.to_string()))?;

        self.dismiss_popups(page).await;

        for action in &request.actions {
            match action {
                PageAction::WaitMs(ms) => {
                    tokio::time::sleep(Duration::from_millis(*ms)).await;
                }
                PageAction::Click(selector) => {
                    page.find_element(selector.as_str())
                        .await
                        .map_err(|e| {
                            EngineError::Other(format!("Click failed, element not found: {}", e))
                        })?
                        .click()
                        .await
                        .map_err(|e| EngineError::Other(format!("Click failed: {}", e)))?;
                }
            }
        }

        self.apply_wait(page, &request.wait, deadline).await;

        // Bounded observation window: hold the page open, then tear down
        let observed_responses = if request.sniff {
            tokio::time::sleep(Duration::from_millis(request.sniff_window_ms)).await;
            if let Some(task) = listener_task.take() {
                task.abort();
            }
            self.drain_observed(page, &observed).await
        } else {
            Vec::new()
        };

        let final_url = page
            .url()
            .await
            .map_err(|e| EngineError::Browser(e.to_string()))?
            .unwrap_or_else(|| request.url.clone());
        let html = page
            .content()
            .await
            .map_err(|e| EngineError::Browser(e.to_string()))?;

        Ok(RenderedPage {
            final_url,
            html,
            // goto does not surface the HTTP status in this API version
            status: 200,
            observed_responses,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_score() {
        let engine = BrowserEngine::new(Vec::new());

        assert_eq!(engine.support_score(&FetchRequest::rendered("http://example.com")), 100);

        let mut sniffing = FetchRequest::new("http://example.com");
        sniffing.sniff = true;
        assert_eq!(engine.support_score(&sniffing), 100);

        assert_eq!(engine.support_score(&FetchRequest::new("http://example.com")), 10);
    }

    #[tokio::test]
    async fn test_release_guard_fires_when_timeout_cancels_future() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();

        let work = async {
            let _guard = ReleaseGuard::new(move || flag.store(true, Ordering::SeqCst));
            tokio::time::sleep(Duration::from_secs(60)).await;
        };
        let result = tokio::time::timeout(Duration::from_millis(20), work).await;

        assert!(result.is_err());
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_release_guard_fires_on_normal_drop() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        {
            let _guard = ReleaseGuard::new(move || flag.store(true, Ordering::SeqCst));
        }
        assert!(released.load(Ordering::SeqCst));
    }
}
