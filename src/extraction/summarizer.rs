// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

/// 摘要生成器接口
///
/// 自然语言摘要是外部协作者，核心只依赖这个契约。
/// 默认实现不生成摘要，摘要字段保持为空。
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Option<String>;
}

/// 不生成摘要的默认实现
pub struct NoopSummarizer;

#[async_trait]
impl Summarizer for NoopSummarizer {
    async fn summarize(&self, _text: &str) -> Option<String> {
        None
    }
}
