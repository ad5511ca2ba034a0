// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{FieldName, Floorplan, NormalizedValue, RawFloorplan, RecordKind};
use crate::utils::text_processing;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::trace;

static RELATIVE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s+(hour|hours|day|days|week|weeks|month|months|minute|minutes)\s+ago")
        .unwrap()
});

// Comma groups included so "1,050 sq ft" parses as 1050, not 1
static LEADING_INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d[\d,]*)").unwrap());

static PRICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)").unwrap());

/// 按顺序尝试已接受的时间格式，首个命中即返回
///
/// Relative phrases ("3 hours ago") are resolved against the supplied
/// observation time, not the wall clock, so normalization is reproducible.
pub fn parse_datetime(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // ISO-8601 / RFC 3339
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Relative: "3 hours ago", "2 days ago"
    if let Some(captures) = RELATIVE_TIME_RE.captures(raw) {
        let num: i64 = captures.get(1)?.as_str().parse().ok()?;
        let duration = match captures.get(2)?.as_str().to_lowercase().as_str() {
            "minute" | "minutes" => Duration::minutes(num),
            "hour" | "hours" => Duration::hours(num),
            "day" | "days" => Duration::days(num),
            "week" | "weeks" => Duration::weeks(num),
            "month" | "months" => Duration::days(num * 30), // Approximation
            _ => return None,
        };
        return Some(now - duration);
    }

    // Locale format: "6/1/2024, 3:05 PM"
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%m/%d/%Y, %I:%M %p") {
        return Some(dt.and_utc());
    }

    // Bare dates
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%b %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%B %d, %Y"))
    {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}

/// 字段规范化配置
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// 自由文本字段截断上限（字符数）
    pub summary_max_chars: usize,
    pub article_max_chars: usize,
    /// 机构枚举词表，大小写不敏感子串匹配，首个命中生效
    pub agency_vocabulary: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            summary_max_chars: 500,
            article_max_chars: 20_000,
            agency_vocabulary: vec![
                "Charleston Police Department".to_string(),
                "North Charleston Police Department".to_string(),
                "Charleston County Sheriff's Office".to_string(),
                "South Carolina Highway Patrol".to_string(),
                "Mount Pleasant Police Department".to_string(),
                "Charleston Fire Department".to_string(),
                "EMS".to_string(),
            ],
        }
    }
}

/// 字段规范化器
///
/// 逐字段独立、全函数（never throws）：无法解析的片段归为 null 字段，
/// 从不使整条记录失败
pub struct FieldNormalizer {
    config: NormalizerConfig,
}

impl FieldNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// 将策略产出的原始字符串字段映射为规范类型
    pub fn normalize(
        &self,
        kind: RecordKind,
        raw: &HashMap<FieldName, String>,
        now: DateTime<Utc>,
    ) -> HashMap<FieldName, NormalizedValue> {
        let mut normalized = HashMap::new();

        for (field, value) in raw {
            let value = text_processing::clean_whitespace(value);
            if value.is_empty() {
                continue;
            }
            let result = match field {
                FieldName::DateTime => {
                    parse_datetime(&value, now).map(NormalizedValue::Timestamp)
                }
                FieldName::VehiclesInvolved
                | FieldName::Injuries
                | FieldName::Fatalities
                | FieldName::Bedrooms => self.normalize_count(&value),
                FieldName::BasePrice => self.normalize_price(&value),
                FieldName::Agencies => self.normalize_agency(&value),
                FieldName::Summary => Some(NormalizedValue::Text(
                    text_processing::truncate_at(&value, self.config.summary_max_chars),
                )),
                FieldName::Cause | FieldName::ArticleText => Some(NormalizedValue::Text(
                    text_processing::truncate_at(&value, self.config.article_max_chars),
                )),
                _ => Some(NormalizedValue::Text(value.clone())),
            };

            match result {
                Some(v) => {
                    normalized.insert(*field, v);
                }
                None => {
                    // Unparseable fragments are quarantined as absent fields
                    trace!(kind = ?kind, field = ?field, raw = %value, "field failed normalization, nulled");
                }
            }
        }

        normalized
    }

    /// 户型子记录规范化：逐字段 best-effort，全空的户型被丢弃
    pub fn normalize_floorplans(&self, raw: &[RawFloorplan]) -> Vec<Floorplan> {
        raw.iter()
            .filter(|fp| !fp.is_empty())
            .map(|fp| Floorplan {
                name: fp
                    .name
                    .as_deref()
                    .map(text_processing::clean_whitespace)
                    .filter(|s| !s.is_empty()),
                beds: fp.beds.as_deref().and_then(parse_count),
                baths: fp.baths.as_deref().and_then(parse_count),
                sqft: fp.sqft.as_deref().and_then(parse_count),
                price: fp.price.as_deref().and_then(parse_price),
            })
            .collect()
    }

    fn normalize_count(&self, raw: &str) -> Option<NormalizedValue> {
        parse_count(raw).map(NormalizedValue::Integer)
    }

    fn normalize_price(&self, raw: &str) -> Option<NormalizedValue> {
        parse_price(raw).map(NormalizedValue::Price)
    }

    fn normalize_agency(&self, raw: &str) -> Option<NormalizedValue> {
        let raw_lower = raw.to_lowercase();
        self.config
            .agency_vocabulary
            .iter()
            .find(|agency| raw_lower.contains(&agency.to_lowercase()))
            .map(|agency| NormalizedValue::Text(agency.clone()))
    }
}

/// 从 "2 Beds"、"Studio" 等字符串解析数量；Studio 记 0
fn parse_count(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.to_lowercase().contains("studio") {
        return Some(0);
    }
    LEADING_INT_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

/// 从 "$1,250"、"Starting at $999/mo" 等字符串解析首个十进制数
fn parse_price(raw: &str) -> Option<f64> {
    PRICE_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}
