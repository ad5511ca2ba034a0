// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{FieldName, Record};
use crate::utils::text_processing;
use dashmap::DashMap;
use deunicode::deunicode;
use strsim::jaro_winkler;
use tracing::debug;

/// 批内软去重器
///
/// URL 身份键不足以识别同一物理实体时（不同样式的 URL 指向同一处房产），
/// 以规范化展示名 + 规范化地址的组合键在同批次内折叠，保留先见条目。
/// 地址相同而名称相近（Jaro-Winkler 超过阈值）的条目同样折叠。
pub struct SoftDeduper {
    /// 组合键 -> 先见条目的 URL
    seen: DashMap<String, String>,
    /// 规范化地址 -> 已接纳的规范化名称列表
    names_by_address: DashMap<String, Vec<String>>,
    similarity_threshold: f64,
}

impl SoftDeduper {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            seen: DashMap::new(),
            names_by_address: DashMap::new(),
            similarity_threshold,
        }
    }

    /// 判定是否接纳该记录；同批内重复返回 false
    ///
    /// Records without a display name fall through to the hard URL dedup
    /// in the persistence layer and are always admitted here.
    pub fn admit(&self, record: &Record) -> bool {
        let Some(name) = record.field_text(FieldName::Name).map(normalize_component) else {
            return true;
        };
        if name.is_empty() {
            return true;
        }
        let address = record
            .field_text(FieldName::Address)
            .map(normalize_component)
            .unwrap_or_default();

        let composite = format!("{}|{}", name, address);
        if let Some(first) = self.seen.get(&composite) {
            debug!(url = %record.url, first_seen = %first.value(), "soft-dedup: composite key collision");
            return false;
        }

        // Same address, near-identical name: treat as the same entity
        if !address.is_empty() {
            if let Some(existing) = self.names_by_address.get(&address) {
                for other in existing.iter() {
                    if jaro_winkler(&name, other) >= self.similarity_threshold {
                        debug!(
                            url = %record.url,
                            name = %name,
                            matched = %other,
                            "soft-dedup: similar name at identical address"
                        );
                        return false;
                    }
                }
            }
        }

        self.seen.insert(composite, record.url.clone());
        if !address.is_empty() {
            self.names_by_address.entry(address).or_default().push(name);
        }
        true
    }
}

/// 规范化组合键分量：转写非 ASCII、折叠空白、小写
fn normalize_component(raw: &str) -> String {
    text_processing::clean_whitespace(&deunicode(raw)).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{NormalizedValue, RecordKind};
    use chrono::Utc;
    use std::collections::HashMap;

    fn listing(url: &str, name: &str, address: &str) -> Record {
        let mut fields = HashMap::new();
        fields.insert(FieldName::Name, NormalizedValue::Text(name.to_string()));
        if !address.is_empty() {
            fields.insert(FieldName::Address, NormalizedValue::Text(address.to_string()));
        }
        Record {
            identity_key: url.to_string(),
            kind: RecordKind::Listing,
            url: url.to_string(),
            title: None,
            source_name: None,
            published_at: None,
            fields,
            floorplans: Vec::new(),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_seen_wins() {
        let deduper = SoftDeduper::new(0.95);
        let a = listing("https://a.example.com", "Chase Landing", "100 Main St");
        let b = listing("https://b.example.com", "CHASE  LANDING", "100 Main St");

        assert!(deduper.admit(&a));
        assert!(!deduper.admit(&b));
    }

    #[test]
    fn test_different_address_admitted() {
        let deduper = SoftDeduper::new(0.95);
        let a = listing("https://a.example.com", "Chase Landing", "100 Main St");
        let b = listing("https://b.example.com", "Chase Landing", "200 Oak Ave");

        assert!(deduper.admit(&a));
        assert!(deduper.admit(&b));
    }

    #[test]
    fn test_similar_name_same_address_collapsed() {
        let deduper = SoftDeduper::new(0.92);
        let a = listing("https://a.example.com", "Chase Landing Apartments", "100 Main St");
        let b = listing("https://b.example.com", "Chase Landing Apartment", "100 Main St");

        assert!(deduper.admit(&a));
        assert!(!deduper.admit(&b));
    }

    #[test]
    fn test_unicode_name_variants_collapse() {
        let deduper = SoftDeduper::new(0.95);
        let a = listing("https://a.example.com", "Café Résidence", "5 Rue Neuve");
        let b = listing("https://b.example.com", "Cafe Residence", "5 Rue Neuve");

        assert!(deduper.admit(&a));
        assert!(!deduper.admit(&b));
    }

    #[test]
    fn test_nameless_record_always_admitted() {
        let deduper = SoftDeduper::new(0.95);
        let mut record = listing("https://a.example.com", "x", "");
        record.fields.clear();

        assert!(deduper.admit(&record));
        assert!(deduper.admit(&record));
    }
}
