// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use harvestrs::config::settings::DatabaseSettings;
use harvestrs::domain::models::{FieldName, NormalizedValue, Record, RecordKind};
use harvestrs::domain::repositories::record_repository::{RecordRepository, UpsertOutcome};
use harvestrs::infrastructure::database::{create_pool, ensure_schema};
use harvestrs::infrastructure::repositories::SqliteRecordRepository;
use harvestrs::utils::url_utils;
use std::collections::HashMap;

async fn memory_repo() -> SqliteRecordRepository {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
        connect_timeout: Some(5),
    };
    let pool = create_pool(&settings).await.unwrap();
    ensure_schema(&pool).await.unwrap();
    SqliteRecordRepository::new(pool, false)
}

fn accident_record(identity_key: &str, url: &str) -> Record {
    let mut fields = HashMap::new();
    fields.insert(
        FieldName::ArticleText,
        NormalizedValue::Text("Two-car collision on Highway 17 near Mount Pleasant.".to_string()),
    );
    Record {
        identity_key: identity_key.to_string(),
        kind: RecordKind::Accident,
        url: url.to_string(),
        title: Some("Collision on Highway 17".to_string()),
        source_name: Some("live5news.com".to_string()),
        published_at: None,
        fields,
        floorplans: Vec::new(),
        extracted_at: Utc::now(),
    }
}

#[tokio::test]
async fn repeated_upsert_leaves_row_count_unchanged() {
    let repo = memory_repo().await;
    let record = accident_record("key-1", "https://example.com/news/crash");

    assert_eq!(repo.upsert(&record).await.unwrap(), UpsertOutcome::Inserted);
    for _ in 0..3 {
        assert_eq!(
            repo.upsert(&record).await.unwrap(),
            UpsertOutcome::SkippedDuplicate
        );
    }
    assert_eq!(repo.count().await.unwrap(), 1);
}

/// 同一页面的两种 URL 写法只产生一条记录
#[tokio::test]
async fn tracking_param_variants_share_one_record() {
    let repo = memory_repo().await;
    let strip: Vec<String> = vec!["fbclid".to_string()];

    let plain = "https://Example.com/news/crash";
    let tracked = "https://example.com/news/crash?utm_source=feed&fbclid=abc#comments";

    let key_a = url_utils::identity_key(plain, &strip).unwrap();
    let key_b = url_utils::identity_key(tracked, &strip).unwrap();
    assert_eq!(key_a, key_b);

    repo.upsert(&accident_record(&key_a, plain)).await.unwrap();
    let outcome = repo.upsert(&accident_record(&key_b, tracked)).await.unwrap();

    assert_eq!(outcome, UpsertOutcome::SkippedDuplicate);
    assert_eq!(repo.count().await.unwrap(), 1);

    // 保留的是第一次写入的 URL
    let stored = repo.find_by_key(&key_a).await.unwrap().unwrap();
    assert_eq!(stored.url, plain);
}

#[tokio::test]
async fn distinct_pages_get_distinct_rows() {
    let repo = memory_repo().await;
    let strip: Vec<String> = Vec::new();

    let key_a = url_utils::identity_key("https://example.com/news/a", &strip).unwrap();
    let key_b = url_utils::identity_key("https://example.com/news/b", &strip).unwrap();
    assert_ne!(key_a, key_b);

    repo.upsert(&accident_record(&key_a, "https://example.com/news/a"))
        .await
        .unwrap();
    repo.upsert(&accident_record(&key_b, "https://example.com/news/b"))
        .await
        .unwrap();

    assert_eq!(repo.count().await.unwrap(), 2);
}
