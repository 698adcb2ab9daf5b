//! Note analysis: similarity, clinical extractors, per-record metrics and ranking

pub mod comparator;
pub mod extractors;
pub mod metrics;
pub mod scoring;
pub mod similarity;
pub mod text;

pub use comparator::{AggregatedResults, ComparisonEngine, MetricCallout, ModelRanking};
pub use extractors::{extract_symptoms, ClinicalPatterns};
pub use metrics::{
    null_field_ratio, schema_valid, section_completeness, EvaluationRecord, MetricEvaluator,
};
pub use scoring::{LatencyStats, MetricSummary};
pub use similarity::{fuzzy_contains, jaccard, lcs_length, rouge_l, word_overlap};
pub use text::{normalize, token_set, tokenize};
