// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 事故新闻正文的字段提取电池
//!
//! 对已提取的正文跑一组固定正则，逐字段独立、命中即取。
//! 提取出的都是原始字符串片段，类型转换由规范化器负责。

use crate::domain::models::FieldName;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(North Charleston|Charleston|Summerville|Ladson|Goose Creek|Mount Pleasant|Moncks Corner|James Island|West Ashley)",
    )
    .unwrap()
});

// A clock time anywhere in the article beats a day-period word appearing
// earlier; period words are only a fallback
static CLOCK_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2}:\d{2}\s?(?:AM|PM))").unwrap());

static DAY_PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(morning|afternoon|evening|night)").unwrap());

static VEHICLES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+\s+vehicles?|two\s+cars|multiple\s+vehicles|a\s+(?:car|truck|SUV|motorcycle))")
        .unwrap()
});

static INJURIES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\b\d+\s+(?:people|person)\s+injured\b|injured\b|suffered\s+injur(?:y|ies)|non[-\s]?life[-\s]?threatening\s+injur(?:y|ies)|serious\s+injur(?:y|ies)|minor\s+injur(?:y|ies)|injur(?:y|ies)\s+were\s+reported|taken\s+to\s+(?:the\s+)?hospital|transported\s+to\s+(?:a\s+)?(?:medical\s+center|hospital)|treated\s+on\s+scene)",
    )
    .unwrap()
});

static FATALITIES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\b\d+\s+(?:people|person|victim|man|men|woman|women|driver|passenger|motorcyclist)\s+killed\b|killing\s+(?:the\s+)?(?:driver|passenger|occupant|sole\s+occupant)|died(?:\s+at\s+the\s+scene)?|pronounced\s+dead|fatal\s+injur(?:y|ies)|fatalit(?:y|ies))",
    )
    .unwrap()
});

static AGENCIES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(Highway Patrol|SCHP|Sheriff|Fire Rescue|EMS|Coroner|Police Department)")
        .unwrap()
});

static CAUSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:caused by|due to|after)\s([^.]+)").unwrap()
});

/// 对正文运行全部字段正则，返回命中的原始片段
pub fn extract_fields(text: &str) -> HashMap<FieldName, String> {
    let mut fields = HashMap::new();

    if let Some(m) = LOCATION_RE.captures(text).and_then(|c| c.get(1)) {
        fields.insert(FieldName::Location, m.as_str().to_string());
    }
    if let Some(m) = CLOCK_TIME_RE
        .captures(text)
        .or_else(|| DAY_PERIOD_RE.captures(text))
        .and_then(|c| c.get(1))
    {
        fields.insert(FieldName::DateTime, m.as_str().to_string());
    }
    if let Some(m) = VEHICLES_RE.captures(text).and_then(|c| c.get(1)) {
        fields.insert(FieldName::VehiclesInvolved, m.as_str().to_string());
    }
    if let Some(m) = INJURIES_RE.find(text) {
        fields.insert(FieldName::Injuries, m.as_str().to_string());
    }
    if let Some(m) = FATALITIES_RE.find(text) {
        fields.insert(FieldName::Fatalities, m.as_str().to_string());
    }
    if let Some(m) = AGENCIES_RE.captures(text).and_then(|c| c.get(1)) {
        fields.insert(FieldName::Agencies, m.as_str().to_string());
    }
    if let Some(m) = CAUSE_RE.captures(text).and_then(|c| c.get(1)) {
        fields.insert(FieldName::Cause, m.as_str().trim().to_string());
    }

    fields
}
