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

use crate::config::settings::DatabaseSettings;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// 创建数据库连接池
///
/// # 参数
///
/// * `settings` - 数据库配置
///
/// # 返回值
///
/// * `Ok(SqlitePool)` - 数据库连接池
/// * `Err(sqlx::Error)` - 连接过程中出现的错误
pub async fn create_pool(settings: &DatabaseSettings) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&settings.url)?.create_if_missing(true);

    let mut pool_options = SqlitePoolOptions::new();

    if let Some(max) = settings.max_connections {
        pool_options = pool_options.max_connections(max);
    }

    if let Some(timeout) = settings.connect_timeout {
        pool_options = pool_options.acquire_timeout(Duration::from_secs(timeout));
    }

    pool_options.connect_with(options).await
}

/// 初始化表结构
///
/// 幂等执行：表已存在时不做任何修改。
/// 身份键为主键，是跨 worker 幂等写入的唯一串行化点。
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            identity_key      TEXT PRIMARY KEY,
            kind              TEXT NOT NULL,
            url               TEXT NOT NULL,
            title             TEXT,
            source_name       TEXT,
            published_at      TEXT,
            location          TEXT,
            date_time         TEXT,
            vehicles_involved TEXT,
            injuries          TEXT,
            fatalities        TEXT,
            agencies          TEXT,
            cause             TEXT,
            summary           TEXT,
            article_text      TEXT,
            name              TEXT,
            address           TEXT,
            city              TEXT,
            state             TEXT,
            bedrooms          INTEGER,
            base_price        REAL,
            phone             TEXT,
            floorplans        TEXT NOT NULL DEFAULT '[]',
            extracted_at      TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_kind ON records(kind)")
        .execute(pool)
        .await?;

    Ok(())
}
