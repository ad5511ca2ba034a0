// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 条目处理状态机
///
/// Pending -> Scoring -> (Rejected | Fetching) -> (FetchFailed | Extracting)
/// -> (ExtractionEmpty | Normalizing) -> (Persisted | SkippedDuplicate | Failed)
///
/// 批次被取消时未开始的条目记作 NotAttempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    Scoring,
    Fetching,
    Extracting,
    Normalizing,
    // 终态
    Rejected,
    FetchFailed,
    ExtractionEmpty,
    Persisted,
    SkippedDuplicate,
    Failed,
    NotAttempted,
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemState::Rejected
                | ItemState::FetchFailed
                | ItemState::ExtractionEmpty
                | ItemState::Persisted
                | ItemState::SkippedDuplicate
                | ItemState::Failed
                | ItemState::NotAttempted
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemState::Persisted | ItemState::SkippedDuplicate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Pending => "pending",
            ItemState::Scoring => "scoring",
            ItemState::Fetching => "fetching",
            ItemState::Extracting => "extracting",
            ItemState::Normalizing => "normalizing",
            ItemState::Rejected => "rejected",
            ItemState::FetchFailed => "fetch_failed",
            ItemState::ExtractionEmpty => "extraction_empty",
            ItemState::Persisted => "persisted",
            ItemState::SkippedDuplicate => "skipped_duplicate",
            ItemState::Failed => "failed",
            ItemState::NotAttempted => "not_attempted",
        }
    }
}

/// 单条目的终态报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    pub url: String,
    pub state: ItemState,
    pub error_cause: Option<String>,
}

impl ItemReport {
    pub fn new(url: impl Into<String>, state: ItemState) -> Self {
        Self {
            url: url.into(),
            state,
            error_cause: None,
        }
    }

    pub fn with_cause(url: impl Into<String>, state: ItemState, cause: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state,
            error_cause: Some(cause.into()),
        }
    }
}

/// 批次报告
///
/// 按终态计数，并枚举所有非成功终态条目及其原因
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub counts: BTreeMap<String, usize>,
    pub failures: Vec<ItemReport>,
}

impl BatchReport {
    pub fn from_items(items: Vec<ItemReport>) -> Self {
        let mut report = BatchReport {
            total: items.len(),
            ..Default::default()
        };
        for item in items {
            *report
                .counts
                .entry(item.state.as_str().to_string())
                .or_insert(0) += 1;
            if !item.state.is_success() {
                report.failures.push(item);
            }
        }
        report
    }

    pub fn count(&self, state: ItemState) -> usize {
        self.counts.get(state.as_str()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ItemState::Persisted.is_terminal());
        assert!(ItemState::Rejected.is_terminal());
        assert!(ItemState::NotAttempted.is_terminal());
        assert!(!ItemState::Fetching.is_terminal());
    }

    #[test]
    fn test_report_aggregation() {
        let items = vec![
            ItemReport::new("http://a", ItemState::Persisted),
            ItemReport::new("http://b", ItemState::SkippedDuplicate),
            ItemReport::with_cause("http://c", ItemState::Failed, "timeout"),
            ItemReport::new("http://d", ItemState::Rejected),
        ];
        let report = BatchReport::from_items(items);

        assert_eq!(report.total, 4);
        assert_eq!(report.count(ItemState::Persisted), 1);
        assert_eq!(report.count(ItemState::Failed), 1);
        // 只有非成功终态进入失败清单
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].error_cause.as_deref(), Some("timeout"));
    }
}
