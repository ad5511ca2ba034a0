// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::extraction::{FieldName, RecordKind};
use crate::domain::models::record::{Floorplan, NormalizedValue, Record};
use crate::domain::repositories::record_repository::{RecordRepository, UpsertOutcome};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

/// 文本类字段列，写入时按固定顺序绑定
///
/// DateTime 不在此列：它规范化为时间戳，和 published_at 一样按
/// RFC3339 单独绑定
const TEXT_FIELDS: [FieldName; 12] = [
    FieldName::Location,
    FieldName::VehiclesInvolved,
    FieldName::Injuries,
    FieldName::Fatalities,
    FieldName::Agencies,
    FieldName::Cause,
    FieldName::Summary,
    FieldName::ArticleText,
    FieldName::Name,
    FieldName::Address,
    FieldName::City,
    FieldName::State,
];

/// SQLite 记录仓库实现
///
/// 默认使用 INSERT OR IGNORE 实现幂等写入：主键冲突时静默跳过，
/// 从不覆盖已有记录。refresh 模式改用 INSERT OR REPLACE，
/// 用同一身份键的新数据整行覆盖旧数据。
pub struct SqliteRecordRepository {
    /// 数据库连接池
    pool: SqlitePool,
    /// 是否允许覆盖已有记录
    refresh: bool,
}

impl SqliteRecordRepository {
    /// 创建新的记录仓库实例
    pub fn new(pool: SqlitePool, refresh: bool) -> Self {
        Self { pool, refresh }
    }

    fn row_to_record(row: &SqliteRow) -> Result<Record, RepositoryError> {
        let kind: String = row.try_get("kind")?;
        let kind = match kind.as_str() {
            "accident" => RecordKind::Accident,
            "listing" => RecordKind::Listing,
            other => {
                return Err(RepositoryError::InternalError(format!(
                    "unknown record kind in storage: {}",
                    other
                )))
            }
        };

        let mut fields: HashMap<FieldName, NormalizedValue> = HashMap::new();
        for field in TEXT_FIELDS {
            let value: Option<String> = row.try_get(field.column())?;
            if let Some(text) = value {
                fields.insert(field, NormalizedValue::Text(text));
            }
        }
        let date_time: Option<String> = row.try_get(FieldName::DateTime.column())?;
        if let Some(ts) = date_time
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        {
            fields.insert(
                FieldName::DateTime,
                NormalizedValue::Timestamp(ts.with_timezone(&Utc)),
            );
        }
        let bedrooms: Option<i64> = row.try_get(FieldName::Bedrooms.column())?;
        if let Some(n) = bedrooms {
            fields.insert(FieldName::Bedrooms, NormalizedValue::Integer(n));
        }
        let base_price: Option<f64> = row.try_get(FieldName::BasePrice.column())?;
        if let Some(p) = base_price {
            fields.insert(FieldName::BasePrice, NormalizedValue::Price(p));
        }
        let phone: Option<String> = row.try_get(FieldName::Phone.column())?;
        if let Some(text) = phone {
            fields.insert(FieldName::Phone, NormalizedValue::Text(text));
        }

        let floorplans_json: String = row.try_get("floorplans")?;
        let floorplans: Vec<Floorplan> = serde_json::from_str(&floorplans_json)
            .map_err(|e| RepositoryError::InternalError(format!("corrupt floorplans column: {}", e)))?;

        let published_at: Option<String> = row.try_get("published_at")?;
        let published_at = published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let extracted_at: String = row.try_get("extracted_at")?;
        let extracted_at = DateTime::parse_from_rfc3339(&extracted_at)
            .map_err(|e| RepositoryError::InternalError(format!("corrupt extracted_at column: {}", e)))?
            .with_timezone(&Utc);

        Ok(Record {
            identity_key: row.try_get("identity_key")?,
            kind,
            url: row.try_get("url")?,
            title: row.try_get("title")?,
            source_name: row.try_get("source_name")?,
            published_at,
            fields,
            floorplans,
            extracted_at,
        })
    }
}

#[async_trait]
impl RecordRepository for SqliteRecordRepository {
    async fn upsert(&self, record: &Record) -> Result<UpsertOutcome, RepositoryError> {
        let verb = if self.refresh {
            "INSERT OR REPLACE"
        } else {
            "INSERT OR IGNORE"
        };
        let sql = format!(
            "{} INTO records (\
                identity_key, kind, url, title, source_name, published_at, \
                date_time, location, vehicles_involved, injuries, fatalities, \
                agencies, cause, summary, article_text, \
                name, address, city, state, bedrooms, base_price, phone, \
                floorplans, extracted_at\
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            verb
        );

        let floorplans_json = serde_json::to_string(&record.floorplans)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

        let mut query = sqlx::query(&sql)
            .bind(&record.identity_key)
            .bind(record.kind.as_str())
            .bind(&record.url)
            .bind(&record.title)
            .bind(&record.source_name)
            .bind(record.published_at.map(|dt| dt.to_rfc3339()))
            .bind(
                record
                    .fields
                    .get(&FieldName::DateTime)
                    .and_then(NormalizedValue::as_timestamp)
                    .map(|dt| dt.to_rfc3339()),
            );

        for field in TEXT_FIELDS {
            query = query.bind(record.field_text(field).map(str::to_owned));
        }
        query = query
            .bind(
                record
                    .fields
                    .get(&FieldName::Bedrooms)
                    .and_then(NormalizedValue::as_integer),
            )
            .bind(
                record
                    .fields
                    .get(&FieldName::BasePrice)
                    .and_then(NormalizedValue::as_price),
            )
            .bind(record.field_text(FieldName::Phone).map(str::to_owned))
            .bind(floorplans_json)
            .bind(record.extracted_at.to_rfc3339());

        let result = query.execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            debug!(identity_key = %record.identity_key, "record already persisted, skipping");
            Ok(UpsertOutcome::SkippedDuplicate)
        } else {
            Ok(UpsertOutcome::Inserted)
        }
    }

    async fn find_by_key(&self, identity_key: &str) -> Result<Option<Record>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM records WHERE identity_key = ?")
            .bind(identity_key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
