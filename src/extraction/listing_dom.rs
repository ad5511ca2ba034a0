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
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(?\d{3}\)?[\s.-]\d{3}[\s.-]\d{4}").unwrap());

fn sel(s: &str) -> Selector {
    Selector::parse(s).expect("static selector")
}

/// 房源 DOM 策略
///
/// 按序尝试各租赁模板的结构地标：WillowBridge 轮播、RealPage 单元格、
/// RentCafe 模态框（含 JSON-LD 兜底）、通用卡片网格。
/// 第一个产出非空户型列表的模板胜出；户型按名称在页内去重。
pub struct ListingDomStrategy;

#[async_trait]
impl ExtractionStrategy for ListingDomStrategy {
    fn name(&self) -> &'static str {
        "listing_dom"
    }

    fn matches(&self, ctx: &PageContext) -> bool {
        ctx.kind == RecordKind::Listing && !ctx.page.html.is_empty()
    }

    async fn extract(&self, ctx: &PageContext) -> Result<ExtractionResult, ExtractError> {
        let (fields, floorplans, template) = parse_listing(&ctx.page.html);

        if fields.is_empty() && floorplans.is_empty() {
            return Err(ExtractError::StructuralMismatch(
                "no known listing template matched".to_string(),
            ));
        }
        if let Some(template) = template {
            debug!(url = %ctx.candidate.url, template, plans = floorplans.len(), "listing template matched");
        }

        Ok(ExtractionResult::graded(
            self.name(),
            ctx.kind,
            fields,
            floorplans,
        ))
    }
}

/// 解析在同步代码段内完成；`Html` 不跨 await 持有
pub(crate) fn parse_listing(
    html: &str,
) -> (HashMap<FieldName, String>, Vec<RawFloorplan>, Option<&'static str>) {
    let document = Html::parse_document(html);

    let mut fields = HashMap::new();
    collect_property_fields(&document, &mut fields);

    // Vendor templates, most specific first
    let extractors: [(&'static str, fn(&Html) -> Vec<RawFloorplan>); 4] = [
        ("willowbridge", extract_willowbridge),
        ("realpage", extract_realpage),
        ("rentcafe", extract_rentcafe),
        ("card_grid", extract_card_grid),
    ];

    for (template, extractor) in extractors {
        let floorplans = dedupe_by_name(extractor(&document));
        if !floorplans.is_empty() {
            return (fields, floorplans, Some(template));
        }
    }

    (fields, Vec::new(), None)
}

fn collect_property_fields(document: &Html, fields: &mut HashMap<FieldName, String>) {
    if let Some(name) = first_text(document, "h1.property-name, h1.community-name, h1") {
        fields.insert(FieldName::Name, name);
    }
    if let Some(address) = first_text(document, ".address-bar .address, address, .community-address")
    {
        if let Some(phone) = PHONE_RE.find(&address) {
            fields.insert(FieldName::Phone, phone.as_str().to_string());
        }
        fields.insert(FieldName::Address, address);
    }
}

/// WillowBridge 轮播模板
fn extract_willowbridge(document: &Html) -> Vec<RawFloorplan> {
    let slide = sel("div.floorplan-slide .floorplan");
    document
        .select(&slide)
        .map(|plan| RawFloorplan {
            name: child_text(plan, "h2.title"),
            beds: child_text(plan, "span.plan-beds"),
            baths: child_text(plan, "span.plan-bath"),
            sqft: child_text(plan, "span.plan-sqft"),
            price: child_text(plan, "div.plan-price"),
        })
        .filter(|fp| fp.name.is_some())
        .collect()
}

/// RealPage 单元格模板，info 行形如
/// "Studio | 1 Bath 514 SQFT Starting At $1,205"
fn extract_realpage(document: &Html) -> Vec<RawFloorplan> {
    let cell = sel("div.plan__cell");
    document
        .select(&cell)
        .filter_map(|card| {
            let name = child_text(card, "h2.realpageTitle")?;
            let info = child_text(card, "h3.listing-unit-info").unwrap_or_default();
            let mut fp = parse_pipe_info(&info);
            fp.name = Some(name);
            Some(fp)
        })
        .collect()
}

fn parse_pipe_info(info: &str) -> RawFloorplan {
    let parts: Vec<String> = info
        .split('|')
        .map(|p| text_processing::clean_whitespace(p))
        .collect();

    let mut fp = RawFloorplan {
        beds: parts.first().filter(|p| !p.is_empty()).cloned(),
        baths: parts.get(1).filter(|p| !p.is_empty()).cloned(),
        ..Default::default()
    };
    if let Some(before_sqft) = info.split("SQFT").next() {
        if info.contains("SQFT") {
            if let Some(number) = before_sqft.split_whitespace().last() {
                fp.sqft = Some(number.to_string());
            }
        }
    }
    if let Some(after) = info.split("Starting At").nth(1) {
        fp.price = Some(text_processing::clean_whitespace(after));
    }
    fp
}

/// RentCafe 模态框模板，模态框缺失时回退到 JSON-LD
fn extract_rentcafe(document: &Html) -> Vec<RawFloorplan> {
    let modal = sel("div.modal-content[id^='modal-content-']");
    let mut floorplans: Vec<RawFloorplan> = document
        .select(&modal)
        .filter_map(|m| {
            let name = child_text(m, "h2[id^='fp-modalLabel']")?;
            let mut fp = RawFloorplan {
                name: Some(name),
                price: child_text(m, "span.text-dark.font-weight-medium"),
                ..Default::default()
            };
            let item = sel("ul.list-unstyled li");
            for li in m.select(&item) {
                let text = text_processing::clean_whitespace(&li.text().collect::<String>());
                if text.contains("Bed") {
                    fp.beds = Some(text.replace("Beds", "").replace("Bed", "").trim().to_string());
                } else if text.contains("Bath") {
                    fp.baths =
                        Some(text.replace("Baths", "").replace("Bath", "").trim().to_string());
                } else if text.contains("Sq") {
                    let digits: String =
                        text.chars().filter(|c| c.is_ascii_digit() || *c == '-').collect();
                    fp.sqft = Some(digits);
                }
            }
            Some(fp)
        })
        .collect();

    if floorplans.is_empty() {
        floorplans = extract_json_ld(document);
    }
    floorplans
}

/// JSON-LD `accommodationFloorPlan` 兜底，无价格信息
fn extract_json_ld(document: &Html) -> Vec<RawFloorplan> {
    let script = sel("script[type='application/ld+json']");
    let mut floorplans = Vec::new();

    for node in document.select(&script) {
        let raw = node.text().collect::<String>();
        let Ok(data) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        let Some(plans) = data.get("accommodationFloorPlan").and_then(Value::as_array) else {
            continue;
        };
        for plan in plans {
            let fp = RawFloorplan {
                name: plan.get("name").and_then(Value::as_str).map(str::to_string),
                beds: value_to_string(plan.get("numberOfBedrooms")),
                baths: value_to_string(plan.get("numberOfFullBathrooms")),
                sqft: value_to_string(plan.get("floorSize").and_then(|f| f.get("maxValue"))),
                price: None,
            };
            if fp.name.is_some() {
                floorplans.push(fp);
            }
        }
    }

    floorplans
}

/// 通用卡片网格模板
fn extract_card_grid(document: &Html) -> Vec<RawFloorplan> {
    let card = sel("div.fp-container");
    document
        .select(&card)
        .filter_map(|c| {
            let name = child_text(c, ".fp-title, .card-title")?;
            Some(RawFloorplan {
                name: Some(name),
                beds: child_text(c, ".fp-beds, .nu-bed, .nu-bedrooms"),
                baths: child_text(c, ".fp-baths, .nu-bathroom, .nu-baths"),
                sqft: child_text(c, ".fp-sqft, .nu-area, .nu-squarefeet"),
                price: child_text(c, ".fp-rent, .font-weight-bold"),
            })
        })
        .collect()
}

fn dedupe_by_name(floorplans: Vec<RawFloorplan>) -> Vec<RawFloorplan> {
    let mut seen: Vec<String> = Vec::new();
    floorplans
        .into_iter()
        .filter(|fp| match &fp.name {
            Some(name) => {
                if seen.iter().any(|s| s == name) {
                    false
                } else {
                    seen.push(name.clone());
                    true
                }
            }
            None => true,
        })
        .collect()
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| text_processing::clean_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
}

fn child_text(parent: ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    parent
        .select(&selector)
        .next()
        .map(|el| text_processing::clean_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
}

fn value_to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
