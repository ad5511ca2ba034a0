// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{ExtractionResult, Quality, RecordKind};
use crate::engines::{EngineRouter, FetchRequest, RenderedPage, WaitStrategy};
use crate::extraction::chain::{ExtractionStrategy, StrategyChain};
use crate::extraction::context::PageContext;
use crate::utils::errors::ExtractError;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::url_utils;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// 外站跳转策略
///
/// 落地页带 "Visit Website" 链接时跟进外站，对跳转后的内容按序
/// 尝试子策略：导航栏 "Floor Plans" 链接、猜测的 `/floorplans/`
/// 路径、`#floorplan` 锚点再深入一层链接、租赁模板直接识别。
/// 每个子策略遵循同样的 COMPLETE 即止规则，并各自拥有有界的
/// 重试次数（固定次数、带停顿）后再落空。
pub struct RedirectStrategy {
    router: Arc<EngineRouter>,
    inner: StrategyChain,
    retry_policy: RetryPolicy,
    fetch_timeout: Duration,
}

impl RedirectStrategy {
    pub fn new(
        router: Arc<EngineRouter>,
        inner: StrategyChain,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            router,
            inner,
            retry_policy: RetryPolicy::sub_strategy(),
            fetch_timeout,
        }
    }

    /// 有界重试的跳转抓取：固定次数、固定停顿
    async fn fetch_with_retry(&self, url: &str) -> Result<RenderedPage, ExtractError> {
        let mut request = FetchRequest::rendered(url);
        request.timeout = self.fetch_timeout;
        request.wait = WaitStrategy::FixedMs(2000);

        let mut attempt = 0u32;
        loop {
            match self.router.route(&request).await {
                Ok(page) => return Ok(page),
                Err(e) if self.retry_policy.should_retry(attempt + 1) => {
                    warn!(url, attempt, "redirect sub-fetch failed, pausing: {}", e);
                    tokio::time::sleep(self.retry_policy.calculate_backoff(attempt + 1)).await;
                    attempt += 1;
                }
                Err(e) => return Err(ExtractError::Fetch(e.to_string())),
            }
        }
    }

    /// 对一个跳转后的页面运行内层提取器，合入迄今最佳结果
    async fn try_page(
        &self,
        ctx: &PageContext,
        page: RenderedPage,
        best: &mut ExtractionResult,
    ) {
        let sub_ctx = PageContext::new(ctx.kind, ctx.candidate.clone(), page);
        let result = self.inner.run(&sub_ctx).await;
        if result.quality > best.quality {
            *best = result;
        }
    }
}

#[async_trait]
impl ExtractionStrategy for RedirectStrategy {
    fn name(&self) -> &'static str {
        "redirect"
    }

    fn matches(&self, ctx: &PageContext) -> bool {
        ctx.kind == RecordKind::Listing && find_visit_link(&ctx.page.html).is_some()
    }

    async fn extract(&self, ctx: &PageContext) -> Result<ExtractionResult, ExtractError> {
        let href = find_visit_link(&ctx.page.html).ok_or_else(|| {
            ExtractError::StructuralMismatch("no external visit link on landing page".to_string())
        })?;

        let base = Url::parse(&ctx.page.final_url)
            .map_err(|e| ExtractError::Other(format!("bad landing url: {}", e)))?;
        let external = url_utils::resolve_url(&base, &href)
            .map_err(|e| ExtractError::Other(format!("bad visit link: {}", e)))?;

        debug!(url = %ctx.candidate.url, external = %external, "following external site link");
        let home = self.fetch_with_retry(external.as_str()).await?;
        let home_html = home.html.clone();
        let home_url = Url::parse(&home.final_url).unwrap_or(external);

        let mut best = ExtractionResult::empty(self.name());

        // Vendor template detection on the external landing page itself
        self.try_page(ctx, home, &mut best).await;
        if best.quality == Quality::Complete {
            return Ok(stamp(best, self.name()));
        }

        // Sub-case: a navigation link labeled "Floor Plans"
        let mut targets: Vec<String> = Vec::new();
        if let Some(nav_href) = find_nav_floorplan_link(&home_html) {
            if let Ok(url) = url_utils::resolve_url(&home_url, &nav_href) {
                targets.push(url.to_string());
            }
        }

        // Sub-case: the conventional path suffix
        targets.push(format!("{}/floorplans/", url_utils::site_root(&home_url)));

        // Sub-case: an in-page #floorplan anchor pointing at a deeper link
        if has_floorplan_anchor(&home_html) {
            if let Some(deeper) = find_deeper_floorplan_link(&home_html) {
                if let Ok(url) = url_utils::resolve_url(&home_url, &deeper) {
                    targets.push(url.to_string());
                }
            }
        }

        for target in targets {
            match self.fetch_with_retry(&target).await {
                Ok(page) => {
                    self.try_page(ctx, page, &mut best).await;
                    if best.quality == Quality::Complete {
                        return Ok(stamp(best, self.name()));
                    }
                }
                Err(e) => {
                    warn!(target = %target, "redirect sub-case exhausted: {}", e);
                }
            }
        }

        Ok(stamp(best, self.name()))
    }
}

/// 结果归属本策略，保留内层策略无关紧要
fn stamp(mut result: ExtractionResult, name: &'static str) -> ExtractionResult {
    result.strategy = name;
    result
}

/// 在落地页上找 "Visit Website" 外链
fn find_visit_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for selector_str in ["a.community__visit-website-btn", "a.cta[title='Visit Website']"] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(href) = document
                .select(&selector)
                .next()
                .and_then(|a| a.value().attr("href"))
            {
                return Some(href.to_string());
            }
        }
    }

    // Fallback: any anchor whose text reads "visit website"
    let anchor = Selector::parse("a[href]").ok()?;
    document
        .select(&anchor)
        .find(|a| {
            a.text()
                .collect::<String>()
                .to_lowercase()
                .contains("visit website")
        })
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

/// 导航栏里文本含 "Floor Plans" 的链接
fn find_nav_floorplan_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let anchor = Selector::parse("a[href]").ok()?;
    document
        .select(&anchor)
        .find(|a| {
            let text = a.text().collect::<String>().to_lowercase();
            let href = a.value().attr("href").unwrap_or_default();
            text.contains("floor plan") && !href.starts_with('#')
        })
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

fn has_floorplan_anchor(html: &str) -> bool {
    let document = Html::parse_document(html);
    Selector::parse("a[href='#floorplan']")
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false)
}

fn find_deeper_floorplan_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let anchor = Selector::parse("a[href*='/floor-plan']").ok()?;
    document
        .select(&anchor)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}
