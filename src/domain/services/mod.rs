// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod dedup;
pub mod normalizer;
pub mod scorer;

pub use dedup::SoftDeduper;
pub use normalizer::{FieldNormalizer, NormalizerConfig};
pub use scorer::{CandidateScorer, ScorerConfig};
