// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod candidate;
pub mod extraction;
pub mod record;
pub mod report;

pub use candidate::CandidateItem;
pub use extraction::{ExtractionResult, FieldName, Quality, RawFloorplan, RecordKind};
pub use record::{Floorplan, NormalizedValue, Record};
pub use report::{BatchReport, ItemReport, ItemState};
