//! Evaluation engine for structured clinical note extraction
//!
//! Scores machine-generated SOAP notes against hand-annotated reference
//! consultations and ranks the models that produced them.
//!
//! # Features
//!
//! - Text normalization with Jaccard, ROUGE-L and fuzzy phrase matching
//! - Heuristic negation, symptom, vital-sign and lab extraction
//! - Per-record structural, coverage and hallucination metrics
//! - Grouping by model, image and prompt with a weighted composite ranking
//! - Markdown report and JSON dump output
//!
//! # Example
//!
//! ```no_run
//! use soap_eval::{config::Config, reporting::print_console_report, runner::BatchRunner};
//!
//! let config = Config::load_or_default();
//! let runner = BatchRunner::new(&config).expect("valid clinical patterns");
//! let outcome = runner.run().expect("evaluation run");
//! print_console_report(&outcome.rankings, &outcome.aggregated, &config.batch.primary_prompt);
//! ```

pub mod analysis;
pub mod config;
pub mod notes;
pub mod reporting;
pub mod runner;

pub use config::Config;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::analysis::{
        AggregatedResults, ComparisonEngine, EvaluationRecord, MetricEvaluator, MetricSummary,
        ModelRanking,
    };
    pub use crate::config::{CompositeWeights, Config, MalformedPolicy};
    pub use crate::notes::{CandidateOutput, ReferenceRecord, StructuredNote};
    pub use crate::reporting::{print_console_report, JsonDump, MarkdownWriter};
    pub use crate::runner::{BatchRunner, RunError, RunOutcome};
}
