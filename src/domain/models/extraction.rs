// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 记录域类型
///
/// 决定 COMPLETE 判定所需的必填字段集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// 事故新闻记录
    Accident,
    /// 房源列表记录
    Listing,
}

impl RecordKind {
    /// COMPLETE 判定所需的必填字段
    pub fn required_fields(&self) -> &'static [FieldName] {
        match self {
            RecordKind::Accident => &[FieldName::ArticleText],
            RecordKind::Listing => &[FieldName::Name],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Accident => "accident",
            RecordKind::Listing => "listing",
        }
    }
}

/// 固定字段枚举
///
/// 覆盖两个记录域，每个字段均可独立为空
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    // 事故记录字段
    Location,
    DateTime,
    VehiclesInvolved,
    Injuries,
    Fatalities,
    Agencies,
    Cause,
    Summary,
    ArticleText,
    // 房源记录字段
    Name,
    Address,
    City,
    State,
    Bedrooms,
    BasePrice,
    Phone,
}

impl FieldName {
    /// 数据库列名
    pub fn column(&self) -> &'static str {
        match self {
            FieldName::Location => "location",
            FieldName::DateTime => "date_time",
            FieldName::VehiclesInvolved => "vehicles_involved",
            FieldName::Injuries => "injuries",
            FieldName::Fatalities => "fatalities",
            FieldName::Agencies => "agencies",
            FieldName::Cause => "cause",
            FieldName::Summary => "summary",
            FieldName::ArticleText => "article_text",
            FieldName::Name => "name",
            FieldName::Address => "address",
            FieldName::City => "city",
            FieldName::State => "state",
            FieldName::Bedrooms => "bedrooms",
            FieldName::BasePrice => "base_price",
            FieldName::Phone => "phone",
        }
    }
}

/// 提取质量等级
///
/// 全序: EMPTY < PARTIAL < COMPLETE。链在比较不同策略的结果时
/// 依赖该排序来保留迄今最优结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quality {
    Empty,
    Partial,
    Complete,
}

/// 未规范化的户型子记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFloorplan {
    pub name: Option<String>,
    pub beds: Option<String>,
    pub baths: Option<String>,
    pub sqft: Option<String>,
    pub price: Option<String>,
}

impl RawFloorplan {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.beds.is_none()
            && self.baths.is_none()
            && self.sqft.is_none()
            && self.price.is_none()
    }
}

/// 单次策略尝试的输出
///
/// 瞬态数据，仅存在于一次提取尝试期间，从不直接持久化
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// 产生该结果的策略标识
    pub strategy: &'static str,
    /// 提取出的原始字段片段
    pub fields: HashMap<FieldName, String>,
    /// 户型子记录（仅房源域）
    pub floorplans: Vec<RawFloorplan>,
    /// 质量等级
    pub quality: Quality,
    /// 策略内部错误（降级为 EMPTY 时记录原因）
    pub error: Option<String>,
}

impl ExtractionResult {
    /// 构造空结果
    pub fn empty(strategy: &'static str) -> Self {
        Self {
            strategy,
            fields: HashMap::new(),
            floorplans: Vec::new(),
            quality: Quality::Empty,
            error: None,
        }
    }

    /// 策略内部失败降级的空结果
    pub fn failed(strategy: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(strategy)
        }
    }

    /// 根据字段内容和记录域计算质量等级后构造结果
    pub fn graded(
        strategy: &'static str,
        kind: RecordKind,
        fields: HashMap<FieldName, String>,
        floorplans: Vec<RawFloorplan>,
    ) -> Self {
        let mut fields = fields;
        fields.retain(|_, v| !v.trim().is_empty());
        let floorplans: Vec<RawFloorplan> =
            floorplans.into_iter().filter(|fp| !fp.is_empty()).collect();

        let quality = grade(kind, &fields, &floorplans);
        Self {
            strategy,
            fields,
            floorplans,
            quality,
            error: None,
        }
    }
}

/// 质量判定
///
/// PARTIAL: 存在至少一个非空字段或子记录；
/// COMPLETE: 该域全部必填字段非空（房源域还要求户型列表非空）
fn grade(
    kind: RecordKind,
    fields: &HashMap<FieldName, String>,
    floorplans: &[RawFloorplan],
) -> Quality {
    if fields.is_empty() && floorplans.is_empty() {
        return Quality::Empty;
    }

    let required_present = kind
        .required_fields()
        .iter()
        .all(|f| fields.get(f).map(|v| !v.trim().is_empty()).unwrap_or(false));

    let complete = match kind {
        RecordKind::Accident => required_present,
        RecordKind::Listing => required_present && !floorplans.is_empty(),
    };

    if complete {
        Quality::Complete
    } else {
        Quality::Partial
    }
}
