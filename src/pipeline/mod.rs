// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 管道编排模块
///
/// 负责把打分、抓取、提取、规范化、去重与持久化串成批次流程
pub mod orchestrator;
pub mod source;

pub use orchestrator::{PipelineConfig, PipelineOrchestrator};
pub use source::{CandidateSource, JsonFileSource};
