// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 仓库层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("未找到数据")]
    NotFound,

    #[error("无效参数: {0}")]
    InvalidParameter(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        RepositoryError::DatabaseError(e.to_string())
    }
}

/// 提取策略错误类型
///
/// 策略内部失败不会中止提取链，链会将其降级为 EMPTY 结果并继续
#[derive(Error, Debug)]
pub enum ExtractError {
    /// 预期的选择器或 JSON 路径不存在
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),

    /// 内嵌 JSON 文档解析失败
    #[error("malformed embedded JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// 子策略的网络访问失败
    #[error("fetch failed during extraction: {0}")]
    Fetch(String),

    /// 其他错误
    #[error("extraction error: {0}")]
    Other(String),
}
