// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{ExtractionResult, FieldName, RawFloorplan, RecordKind};
use crate::extraction::chain::ExtractionStrategy;
use crate::extraction::context::PageContext;
use crate::utils::errors::ExtractError;
use crate::utils::text_processing;
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;

/// 内嵌 JSON 策略
///
/// 定位 `script#__NEXT_DATA__`，解析其中的服务端渲染状态，
/// 沿固定路径取出房产对象，把可租单元按户型标签归组
pub struct EmbeddedJsonStrategy;

const PROPERTY_POINTER: &str = "/props/pageProps/layoutData/sitecore/context/property";

#[async_trait]
impl ExtractionStrategy for EmbeddedJsonStrategy {
    fn name(&self) -> &'static str {
        "embedded_json"
    }

    fn matches(&self, ctx: &PageContext) -> bool {
        ctx.kind == RecordKind::Listing && ctx.page.html.contains("__NEXT_DATA__")
    }

    async fn extract(&self, ctx: &PageContext) -> Result<ExtractionResult, ExtractError> {
        let raw_json = locate_next_data(&ctx.page.html)
            .ok_or_else(|| ExtractError::StructuralMismatch("script#__NEXT_DATA__ not found".to_string()))?;

        let doc: Value = serde_json::from_str(&raw_json)?;
        let property = doc.pointer(PROPERTY_POINTER).ok_or_else(|| {
            ExtractError::StructuralMismatch(format!("JSON path {} absent", PROPERTY_POINTER))
        })?;

        let mut fields = HashMap::new();
        if let Some(name) = property.get("name").and_then(Value::as_str) {
            fields.insert(FieldName::Name, text_processing::clean_whitespace(name));
        }
        if let Some(address) = property.get("address") {
            collect_address(address, &mut fields);
        }
        if let Some(phone) = property.get("phoneNumber").and_then(Value::as_str) {
            fields.insert(FieldName::Phone, phone.trim().to_string());
        }

        let units = property
            .get("availableUnits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let floorplans = group_units_by_floorplan(&units);

        Ok(ExtractionResult::graded(
            self.name(),
            ctx.kind,
            fields,
            floorplans,
        ))
    }
}

/// 解析页面并取出 __NEXT_DATA__ 脚本体
///
/// `Html` is parsed and dropped inside this sync helper; it must not
/// cross an await point.
fn locate_next_data(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script#__NEXT_DATA__").ok()?;
    document
        .select(&selector)
        .next()
        .map(|script| script.text().collect::<String>())
}

fn collect_address(address: &Value, fields: &mut HashMap<FieldName, String>) {
    match address {
        Value::String(s) => {
            fields.insert(FieldName::Address, text_processing::clean_whitespace(s));
        }
        Value::Object(_) => {
            if let Some(line) = address
                .get("addressLine1")
                .or_else(|| address.get("street"))
                .and_then(Value::as_str)
            {
                fields.insert(FieldName::Address, text_processing::clean_whitespace(line));
            }
            if let Some(city) = address.get("city").and_then(Value::as_str) {
                fields.insert(FieldName::City, city.trim().to_string());
            }
            if let Some(state) = address
                .get("state")
                .or_else(|| address.get("stateCode"))
                .and_then(Value::as_str)
            {
                fields.insert(FieldName::State, state.trim().to_string());
            }
        }
        _ => {}
    }
}

/// 按户型标签归组可租单元，同一标签保留首个单元的户型信息
fn group_units_by_floorplan(units: &[Value]) -> Vec<RawFloorplan> {
    let mut seen: Vec<String> = Vec::new();
    let mut floorplans = Vec::new();

    for unit in units {
        let label = unit
            .get("floorPlanLabel")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                unit.get("floorplan")
                    .and_then(|fp| fp.get("label"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
        let Some(label) = label else { continue };
        if seen.iter().any(|s| s == &label) {
            continue;
        }

        let plan = unit.get("floorplan");
        let floorplan = RawFloorplan {
            name: Some(label.clone()),
            beds: plan
                .and_then(|fp| fp.get("bedroomCount"))
                .map(json_number_as_string),
            baths: plan
                .and_then(|fp| fp.get("bathroomCount"))
                .map(json_number_as_string),
            sqft: unit.get("area").map(json_number_as_string),
            price: unit.get("minBasePrice").map(json_number_as_string),
        };
        if !floorplan.is_empty() {
            seen.push(label);
            floorplans.push(floorplan);
        }
    }

    floorplans
}

fn json_number_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CandidateItem, Quality};
    use crate::engines::RenderedPage;
    use serde_json::json;
    use std::time::Duration;

    fn listing_context(html: &str) -> PageContext {
        PageContext::new(
            RecordKind::Listing,
            CandidateItem::new("https://example.com/p", "Property", "greystar"),
            RenderedPage {
                final_url: "https://example.com/p".to_string(),
                html: html.to_string(),
                status: 200,
                observed_responses: Vec::new(),
                elapsed: Duration::from_millis(1),
            },
        )
    }

    fn next_data_page(property: Value) -> String {
        let doc = json!({
            "props": {"pageProps": {"layoutData": {"sitecore": {"context": {"property": property}}}}}
        });
        format!(
            "<html><body><script id=\"__NEXT_DATA__\" type=\"application/json\">{}</script></body></html>",
            doc
        )
    }

    #[tokio::test]
    async fn test_extracts_property_and_groups_units() {
        let html = next_data_page(json!({
            "name": "Chase Landing",
            "address": {"addressLine1": "100 Main St", "city": "Charleston", "state": "SC"},
            "availableUnits": [
                {
                    "unitNumber": "101",
                    "floorPlanLabel": "A1",
                    "area": 750,
                    "minBasePrice": 1205,
                    "floorplan": {"label": "A1", "bedroomCount": 1, "bathroomCount": 1}
                },
                {
                    "unitNumber": "102",
                    "floorPlanLabel": "A1",
                    "area": 750,
                    "minBasePrice": 1250,
                    "floorplan": {"label": "A1", "bedroomCount": 1, "bathroomCount": 1}
                },
                {
                    "unitNumber": "201",
                    "floorPlanLabel": "B2",
                    "area": 1100,
                    "minBasePrice": 1800,
                    "floorplan": {"label": "B2", "bedroomCount": 2, "bathroomCount": 2}
                }
            ]
        }));

        let strategy = EmbeddedJsonStrategy;
        let ctx = listing_context(&html);
        assert!(strategy.matches(&ctx));

        let result = strategy.extract(&ctx).await.unwrap();
        assert_eq!(result.quality, Quality::Complete);
        assert_eq!(result.fields.get(&FieldName::Name).unwrap(), "Chase Landing");
        assert_eq!(result.fields.get(&FieldName::City).unwrap(), "Charleston");
        // Units grouped by label: two distinct floorplans
        assert_eq!(result.floorplans.len(), 2);
        assert_eq!(result.floorplans[0].name.as_deref(), Some("A1"));
        assert_eq!(result.floorplans[0].price.as_deref(), Some("1205"));
    }

    #[tokio::test]
    async fn test_missing_property_path_is_structural_mismatch() {
        let html = "<html><script id=\"__NEXT_DATA__\" type=\"application/json\">{\"props\":{}}</script></html>";
        let strategy = EmbeddedJsonStrategy;
        let result = strategy.extract(&listing_context(html)).await;
        assert!(matches!(result, Err(ExtractError::StructuralMismatch(_))));
    }

    #[tokio::test]
    async fn test_malformed_json_is_reported() {
        let html = "<html><script id=\"__NEXT_DATA__\">{not json</script></html>";
        let strategy = EmbeddedJsonStrategy;
        let result = strategy.extract(&listing_context(html)).await;
        assert!(matches!(result, Err(ExtractError::MalformedJson(_))));
    }

    #[test]
    fn test_matches_requires_marker() {
        let strategy = EmbeddedJsonStrategy;
        assert!(!strategy.matches(&listing_context("<html><body>plain</body></html>")));
    }
}
