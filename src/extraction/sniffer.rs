// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{ExtractionResult, FieldName, RawFloorplan, RecordKind};
use crate::extraction::chain::ExtractionStrategy;
use crate::extraction::context::PageContext;
use crate::utils::errors::ExtractError;
use crate::utils::json_scan::{self, KeyMatch};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// 定价相关键名关键字，命中即认为响应携带租金数据
fn pricing_keywords() -> Vec<String> {
    ["rent", "price", "monthlyrate", "startingfrom", "floorplan", "unit", "availability", "bedroom"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// 响应嗅探策略
///
/// 被动侧信道：浏览器引擎在导航前安装网络观察者，在有界窗口内
/// 收集 JSON 响应；本策略只消费 `RenderedPage` 里已经收好的观察
/// 结果，自身不做任何网络访问。窗口关闭后到达的响应已被引擎丢弃。
pub struct SnifferStrategy;

#[async_trait]
impl ExtractionStrategy for SnifferStrategy {
    fn name(&self) -> &'static str {
        "sniffer"
    }

    fn matches(&self, ctx: &PageContext) -> bool {
        ctx.kind == RecordKind::Listing && !ctx.page.observed_responses.is_empty()
    }

    async fn extract(&self, ctx: &PageContext) -> Result<ExtractionResult, ExtractError> {
        let keywords = pricing_keywords();
        let mut floorplans: Vec<RawFloorplan> = Vec::new();

        for response in &ctx.page.observed_responses {
            let matches = json_scan::scan_keys(&response.body_json, &keywords);
            collect_unit_arrays(&matches, &mut floorplans);
        }

        if floorplans.is_empty() {
            return Err(ExtractError::StructuralMismatch(
                "no pricing-shaped payload among observed responses".to_string(),
            ));
        }

        // The API payloads rarely carry the property display name; the
        // candidate title is the best available source here.
        let mut fields = HashMap::new();
        if !ctx.candidate.title.trim().is_empty() {
            fields.insert(FieldName::Name, ctx.candidate.title.trim().to_string());
        }

        Ok(ExtractionResult::graded(
            self.name(),
            ctx.kind,
            fields,
            floorplans,
        ))
    }
}

/// 从键名命中里找出单元对象数组并映射为户型
fn collect_unit_arrays(matches: &[KeyMatch<'_>], out: &mut Vec<RawFloorplan>) {
    for m in matches {
        let Some(items) = m.value.as_array() else {
            continue;
        };
        for item in items {
            if !item.is_object() {
                continue;
            }
            let floorplan = unit_to_floorplan(item);
            if floorplan.is_empty() {
                continue;
            }
            // Dedupe by name within the page
            let duplicate = floorplan
                .name
                .as_ref()
                .is_some_and(|name| out.iter().any(|fp| fp.name.as_ref() == Some(name)));
            if !duplicate {
                out.push(floorplan);
            }
        }
    }
}

fn unit_to_floorplan(unit: &Value) -> RawFloorplan {
    RawFloorplan {
        name: string_at(unit, &["floorPlanLabel", "floorplanName", "name", "label"]),
        beds: string_at(unit, &["bedrooms", "bedroomCount", "beds"]),
        baths: string_at(unit, &["bathrooms", "bathroomCount", "baths"]),
        sqft: string_at(unit, &["area", "squareFeet", "sqft"]),
        price: string_at(unit, &["minBasePrice", "rent", "price", "monthlyRate", "startingFrom"]),
    }
}

fn string_at(obj: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = obj.get(*key) {
            return match value {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => continue,
            };
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CandidateItem, Quality};
    use crate::engines::{ObservedResponse, RenderedPage};
    use serde_json::json;
    use std::time::Duration;

    fn context_with(responses: Vec<ObservedResponse>) -> PageContext {
        PageContext::new(
            RecordKind::Listing,
            CandidateItem::new("https://example.com/p", "Chase Landing", "greystar"),
            RenderedPage {
                final_url: "https://example.com/p".to_string(),
                html: String::new(),
                status: 200,
                observed_responses: responses,
                elapsed: Duration::from_millis(1),
            },
        )
    }

    fn response(body: serde_json::Value) -> ObservedResponse {
        ObservedResponse {
            url: "https://api.example.com/pricing".to_string(),
            content_type: "application/json".to_string(),
            body_json: body,
        }
    }

    #[tokio::test]
    async fn test_extracts_units_from_observed_pricing_payload() {
        let ctx = context_with(vec![response(json!({
            "data": {
                "availableUnits": [
                    {"floorPlanLabel": "A1", "bedrooms": 1, "bathrooms": 1, "area": 720, "rent": 1395},
                    {"floorPlanLabel": "B2", "bedrooms": 2, "bathrooms": 2, "area": 1080, "rent": 1895}
                ]
            }
        }))]);

        let strategy = SnifferStrategy;
        assert!(strategy.matches(&ctx));

        let result = strategy.extract(&ctx).await.unwrap();
        assert_eq!(result.quality, Quality::Complete);
        assert_eq!(result.floorplans.len(), 2);
        assert_eq!(result.fields.get(&FieldName::Name).unwrap(), "Chase Landing");
        assert_eq!(result.floorplans[1].price.as_deref(), Some("1895"));
    }

    #[tokio::test]
    async fn test_duplicate_labels_across_responses_collapse() {
        let unit = json!({"floorPlanLabel": "A1", "rent": 1395});
        let ctx = context_with(vec![
            response(json!({"units": [unit]})),
            response(json!({"units": [unit]})),
        ]);

        let result = SnifferStrategy.extract(&ctx).await.unwrap();
        assert_eq!(result.floorplans.len(), 1);
    }

    #[tokio::test]
    async fn test_no_pricing_payload_is_structural_mismatch() {
        let ctx = context_with(vec![response(json!({"session": "abc", "locale": "en"}))]);
        let result = SnifferStrategy.extract(&ctx).await;
        assert!(matches!(result, Err(ExtractError::StructuralMismatch(_))));
    }

    #[test]
    fn test_does_not_match_without_observations() {
        assert!(!SnifferStrategy.matches(&context_with(Vec::new())));
    }
}
