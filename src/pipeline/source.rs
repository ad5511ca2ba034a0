// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::CandidateItem;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// 候选条目来源接口
///
/// 发现候选条目的方式（搜索API、站点地图、人工清单）是外部协作者，
/// 管道只消费它们产出的候选列表
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn load(&self) -> anyhow::Result<Vec<CandidateItem>>;
}

/// 从 JSON 文件加载候选条目
///
/// 文件内容为 CandidateItem 的 JSON 数组
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CandidateSource for JsonFileSource {
    async fn load(&self) -> anyhow::Result<Vec<CandidateItem>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            anyhow::anyhow!("failed to read input file {}: {}", self.path.display(), e)
        })?;
        let items: Vec<CandidateItem> = serde_json::from_str(&content).map_err(|e| {
            anyhow::anyhow!("invalid candidate list in {}: {}", self.path.display(), e)
        })?;
        info!(path = %self.path.display(), count = items.len(), "candidate items loaded");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_candidate_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"url": "https://example.com/a", "title": "Crash on I-26", "source_name": "local-news", "published_at": "2025-06-01T10:00:00Z"}}]"#
        )
        .unwrap();

        let source = JsonFileSource::new(file.path());
        let items = source.load().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Crash on I-26");
        assert_eq!(items[0].published_at.as_deref(), Some("2025-06-01T10:00:00Z"));
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let source = JsonFileSource::new(file.path());
        assert!(source.load().await.is_err());
    }
}
