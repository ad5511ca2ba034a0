// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{ExtractionResult, FieldName, RecordKind};
use crate::extraction::accident_fields;
use crate::extraction::chain::ExtractionStrategy;
use crate::extraction::context::PageContext;
use crate::utils::errors::ExtractError;
use crate::utils::text_processing;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::debug;

/// 正文容器的命名回退选择器列表，按声明顺序尝试
const ARTICLE_SELECTORS: &[&str] = &[
    "div.article-content.article-body.rich-text",
    "article",
    "div.entry-content",
    "div.article-body",
    "div.post-content",
    "div#article-body",
    "section.article-content",
];

/// 文章 DOM 策略
///
/// 依结构地标定位正文容器：按固定回退列表逐个尝试选择器，
/// 直到某个选择器命中且产出超过最小长度的文本。接受条件是
/// 文本长度阈值，不是元素存在性——空容器和样板容器不算成功。
/// 正文确定后再跑字段正则电池。
pub struct ArticleDomStrategy {
    /// 单个选择器产出文本的最小接受长度（字符）
    min_text_chars: usize,
}

impl ArticleDomStrategy {
    pub fn new(min_text_chars: usize) -> Self {
        Self { min_text_chars }
    }

    /// 在同步代码段内解析并选出正文，`Html` 不跨 await 持有
    fn find_article_text(&self, html: &str) -> Option<(usize, String)> {
        let document = Html::parse_document(html);

        for (index, selector_str) in ARTICLE_SELECTORS.iter().enumerate() {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            let Some(element) = document.select(&selector).next() else {
                continue;
            };
            let text =
                text_processing::clean_whitespace(&element.text().collect::<Vec<_>>().join(" "));
            if text.chars().count() >= self.min_text_chars {
                return Some((index, text));
            }
        }

        None
    }
}

impl Default for ArticleDomStrategy {
    fn default() -> Self {
        Self::new(50)
    }
}

#[async_trait]
impl ExtractionStrategy for ArticleDomStrategy {
    fn name(&self) -> &'static str {
        "article_dom"
    }

    fn matches(&self, ctx: &PageContext) -> bool {
        ctx.kind == RecordKind::Accident && !ctx.page.html.is_empty()
    }

    async fn extract(&self, ctx: &PageContext) -> Result<ExtractionResult, ExtractError> {
        let (selector_index, article_text) =
            self.find_article_text(&ctx.page.html).ok_or_else(|| {
                ExtractError::StructuralMismatch(
                    "no article container yielded sufficient text".to_string(),
                )
            })?;

        debug!(
            url = %ctx.candidate.url,
            selector = ARTICLE_SELECTORS[selector_index],
            chars = article_text.chars().count(),
            "article container matched"
        );

        let mut fields: HashMap<FieldName, String> = accident_fields::extract_fields(&article_text);
        fields.insert(FieldName::ArticleText, article_text);

        Ok(ExtractionResult::graded(
            self.name(),
            ctx.kind,
            fields,
            Vec::new(),
        ))
    }
}
