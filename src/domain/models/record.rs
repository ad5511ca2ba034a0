// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::models::extraction::{FieldName, RecordKind};

/// 规范化后的字段值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum NormalizedValue {
    Text(String),
    Integer(i64),
    Price(f64),
    Timestamp(DateTime<Utc>),
}

impl NormalizedValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NormalizedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            NormalizedValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_price(&self) -> Option<f64> {
        match self {
            NormalizedValue::Price(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            NormalizedValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// 规范化后的户型子记录
///
/// 依附于父记录，没有独立身份
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Floorplan {
    pub name: Option<String>,
    pub beds: Option<i64>,
    pub baths: Option<i64>,
    pub sqft: Option<i64>,
    pub price: Option<f64>,
}

/// 规范结构化记录
///
/// 全部策略运行且字段规范化后创建；提交后不可变，
/// 所有权归去重/持久化层独占
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// 由规范化URL确定性导出的身份键
    pub identity_key: String,
    pub kind: RecordKind,
    pub url: String,
    pub title: Option<String>,
    pub source_name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// 每个字段独立可空；字段全空但 url/title 有效的记录仍然有效
    pub fields: HashMap<FieldName, NormalizedValue>,
    pub floorplans: Vec<Floorplan>,
    pub extracted_at: DateTime<Utc>,
}

impl Record {
    pub fn field_text(&self, name: FieldName) -> Option<&str> {
        self.fields.get(&name).and_then(|v| v.as_text())
    }
}
