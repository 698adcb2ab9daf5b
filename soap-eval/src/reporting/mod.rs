//! Results reporting

pub mod markdown;

pub use markdown::MarkdownWriter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::{AggregatedResults, ModelRanking};

/// Raw results export for downstream reuse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDump {
    pub generated_at: String,
    pub primary_prompt: String,
    pub rankings: Vec<ModelRanking>,
    pub aggregated: AggregatedResults,
}

impl JsonDump {
    pub fn new(
        generated_at: DateTime<Utc>,
        primary_prompt: impl Into<String>,
        rankings: &[ModelRanking],
        aggregated: &AggregatedResults,
    ) -> Self {
        Self {
            generated_at: generated_at.to_rfc3339(),
            primary_prompt: primary_prompt.into(),
            rankings: rankings.to_vec(),
            aggregated: aggregated.clone(),
        }
    }

    /// Write to JSON file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Read a previously written dump
    pub fn read_from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Print the ranking summary to stdout
pub fn print_console_report(rankings: &[ModelRanking], aggregated: &AggregatedResults, primary_prompt: &str) {
    println!("\n=== SOAP Note Evaluation Results ===\n");
    println!(
        "Records: {} ({} errors) across {} models, {} images, {} prompts\n",
        aggregated.records.len(),
        aggregated.error_count(),
        aggregated.by_model.len(),
        aggregated.by_image.len(),
        aggregated.by_prompt.len()
    );

    println!("Model Rankings (prompt '{}'):", primary_prompt);
    println!("{:-<50}", "");

    if rankings.is_empty() {
        println!("  No records for the primary prompt");
    }
    for ranking in rankings {
        println!(
            "  {}. {} - Composite: {:.3}, Error rate: {:.1}%, Records: {}",
            ranking.rank,
            ranking.model_name,
            ranking.composite(),
            ranking.summary.error_rate * 100.0,
            ranking.summary.count
        );
    }

    println!("\n{:=<50}", "");
}
