// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{CandidateItem, RecordKind};
use crate::engines::RenderedPage;

/// 一次提取尝试的输入
///
/// HTML 以字符串持有。`scraper::Html` 不是 `Send`，策略必须在
/// 同步代码段内就地解析，绝不能把解析后的文档跨 await 点持有。
#[derive(Debug, Clone)]
pub struct PageContext {
    pub kind: RecordKind,
    pub candidate: CandidateItem,
    pub page: RenderedPage,
}

impl PageContext {
    pub fn new(kind: RecordKind, candidate: CandidateItem, page: RenderedPage) -> Self {
        Self {
            kind,
            candidate,
            page,
        }
    }
}
