// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod accident_fields;
pub mod article_dom;
pub mod chain;
pub mod context;
pub mod embedded_json;
pub mod listing_dom;
pub mod redirect;
pub mod sniffer;
pub mod summarizer;

pub use chain::{ExtractionStrategy, StrategyChain};
pub use context::PageContext;
pub use summarizer::{NoopSummarizer, Summarizer};

use crate::config::settings::StrategySettings;
use crate::engines::EngineRouter;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// 按配置的优先级顺序与开关构建策略链
///
/// 未知的策略名记一条警告后忽略；跳转策略内部复用内嵌 JSON
/// 与房源 DOM 两个提取器作为其子策略。
pub fn build_chain(settings: &StrategySettings, router: Arc<EngineRouter>) -> StrategyChain {
    let mut strategies: Vec<Arc<dyn ExtractionStrategy>> = Vec::new();

    for name in &settings.order {
        match name.as_str() {
            "embedded_json" if settings.embedded_json => {
                strategies.push(Arc::new(embedded_json::EmbeddedJsonStrategy));
            }
            "sniffer" if settings.sniffer => {
                strategies.push(Arc::new(sniffer::SnifferStrategy));
            }
            "article_dom" if settings.article_dom => {
                strategies.push(Arc::new(article_dom::ArticleDomStrategy::new(
                    settings.min_article_chars,
                )));
            }
            "listing_dom" if settings.listing_dom => {
                strategies.push(Arc::new(listing_dom::ListingDomStrategy));
            }
            "redirect" if settings.redirect => {
                let inner = StrategyChain::new(vec![
                    Arc::new(embedded_json::EmbeddedJsonStrategy),
                    Arc::new(listing_dom::ListingDomStrategy),
                ]);
                strategies.push(Arc::new(redirect::RedirectStrategy::new(
                    router.clone(),
                    inner,
                    Duration::from_secs(settings.redirect_fetch_timeout_secs),
                )));
            }
            "embedded_json" | "sniffer" | "article_dom" | "listing_dom" | "redirect" => {
                // Disabled by configuration
            }
            other => {
                warn!(strategy = other, "unknown strategy name in configured order, ignored");
            }
        }
    }

    StrategyChain::new(strategies)
}
