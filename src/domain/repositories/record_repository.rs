// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::Record;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;

/// 写入结果
///
/// SkippedDuplicate 是被承认的终态，不是错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    SkippedDuplicate,
}

/// 记录仓储接口
///
/// 对调用方而言是追加仅写：不暴露更新或删除操作。
/// 身份键唯一约束由存储后端保证，是跨 worker 写入的串行化点。
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// 幂等写入：身份键已存在时静默跳过，从不覆盖、从不报错
    async fn upsert(&self, record: &Record) -> Result<UpsertOutcome, RepositoryError>;

    /// 按身份键查找
    async fn find_by_key(&self, identity_key: &str) -> Result<Option<Record>, RepositoryError>;

    /// 记录总数
    async fn count(&self) -> Result<i64, RepositoryError>;
}
