// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 候选条目
///
/// 外部搜索/列表协作者发现的、尚未处理的源页面引用。
/// 创建后不可变，仅被打分阶段消费一次。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateItem {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source_name: String,
    /// 来源方给出的原始发布时间字符串，格式不可信，解析交给规范化器
    #[serde(default)]
    pub published_at: Option<String>,
    /// 来源方的原始负载，仅透传
    #[serde(default)]
    pub raw_payload: serde_json::Value,
}

impl CandidateItem {
    pub fn new(url: impl Into<String>, title: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            source_name: source_name.into(),
            published_at: None,
            raw_payload: serde_json::Value::Null,
        }
    }
}
