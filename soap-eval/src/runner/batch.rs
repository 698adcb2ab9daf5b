//! One offline evaluation run over a results directory

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::{LogProgress, ProgressCallback};
use crate::analysis::{AggregatedResults, ComparisonEngine, EvaluationRecord, MetricEvaluator, ModelRanking};
use crate::config::{Config, MalformedPolicy};
use crate::notes::{discover_result_files, load_candidate, LoadError, ReferenceCache};
use crate::reporting::{JsonDump, MarkdownWriter};

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Results directory not found: {0}")]
    MissingResultsDir(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Invalid clinical pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to write results data to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        RunError::Io { path: path.to_path_buf(), source }
    }
}

/// A result file left out of the run
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub generated_at: DateTime<Utc>,
    pub aggregated: AggregatedResults,
    pub rankings: Vec<ModelRanking>,
    pub skipped: Vec<SkippedFile>,
    pub report_path: PathBuf,
    pub data_path: PathBuf,
}

/// Drives discovery, evaluation, aggregation and output for one run
pub struct BatchRunner<'c> {
    config: &'c Config,
    evaluator: MetricEvaluator,
    engine: ComparisonEngine,
    progress: Box<dyn ProgressCallback>,
}

impl<'c> BatchRunner<'c> {
    pub fn new(config: &'c Config) -> Result<Self, RunError> {
        Ok(Self {
            config,
            evaluator: MetricEvaluator::from_config(config)?,
            engine: ComparisonEngine::new(config.batch.primary_prompt.clone())
                .with_weights(config.weights.clone()),
            progress: Box::new(LogProgress),
        })
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn engine(&self) -> &ComparisonEngine {
        &self.engine
    }

    /// Evaluate every mapped result file.
    ///
    /// Missing references are always skipped. Unreadable or malformed result
    /// files are skipped or abort the run according to `batch.on_malformed`.
    pub fn evaluate_all(&self) -> Result<(Vec<EvaluationRecord>, Vec<SkippedFile>), RunError> {
        let results_dir = &self.config.paths.results_dir;
        if !results_dir.is_dir() {
            return Err(RunError::MissingResultsDir(results_dir.clone()));
        }

        let files = discover_result_files(self.config)?;
        tracing::info!("Found {} result files in {}", files.len(), results_dir.display());

        let mut references = ReferenceCache::new();
        let mut records = Vec::with_capacity(files.len());
        let mut skipped = Vec::new();

        for (done, file) in files.iter().enumerate() {
            self.progress.on_file_start(&file.path);

            let outcome = references
                .get_or_load(&file.reference_path)
                .and_then(|reference| {
                    let candidate = load_candidate(&file.path)?;
                    Ok(self.evaluator.evaluate(reference, &candidate))
                });

            match outcome {
                Ok(record) => {
                    self.progress.on_file_complete(&file.path, record.has_error);
                    records.push(record);
                }
                Err(LoadError::MissingReference(reference)) => {
                    let reason = format!("reference {} not found", reference.display());
                    self.skip(&mut skipped, &file.path, reason);
                }
                Err(e) => match self.config.batch.on_malformed {
                    MalformedPolicy::Skip => self.skip(&mut skipped, &file.path, e.to_string()),
                    MalformedPolicy::Abort => return Err(e.into()),
                },
            }

            self.progress.on_progress(done + 1, files.len());
        }

        Ok((records, skipped))
    }

    fn skip(&self, skipped: &mut Vec<SkippedFile>, path: &Path, reason: String) {
        self.progress.on_file_skipped(path, &reason);
        skipped.push(SkippedFile { path: path.to_path_buf(), reason });
    }

    /// Evaluate, aggregate, rank and write both output files
    pub fn run(&self) -> Result<RunOutcome, RunError> {
        let (records, skipped) = self.evaluate_all()?;

        let aggregated = self.engine.aggregate(records);
        let rankings = self.engine.rank_models(&aggregated);
        tracing::info!(
            "Evaluated {} records ({} errors, {} files skipped), {} models ranked",
            aggregated.records.len(),
            aggregated.error_count(),
            skipped.len(),
            rankings.len()
        );

        let generated_at = Utc::now();
        let (report_path, data_path) = self.write_outputs(&aggregated, &rankings, generated_at)?;

        Ok(RunOutcome {
            generated_at,
            aggregated,
            rankings,
            skipped,
            report_path,
            data_path,
        })
    }

    /// Write the Markdown report and the JSON dump into the output directory
    pub fn write_outputs(
        &self,
        aggregated: &AggregatedResults,
        rankings: &[ModelRanking],
        generated_at: DateTime<Utc>,
    ) -> Result<(PathBuf, PathBuf), RunError> {
        let output_dir = &self.config.paths.output_dir;
        std::fs::create_dir_all(output_dir).map_err(|e| RunError::io(output_dir, e))?;

        let report_path = self.config.report_path();
        MarkdownWriter::new(&self.engine, aggregated, rankings, generated_at)
            .write_to_file(&report_path)
            .map_err(|e| RunError::io(&report_path, e))?;
        tracing::info!("Report written to {}", report_path.display());

        let data_path = self.config.data_path();
        let dump = JsonDump::new(generated_at, self.engine.primary_prompt(), rankings, aggregated);
        dump.write_to_file(&data_path).map_err(|e| RunError::Output {
            path: data_path.clone(),
            source: e,
        })?;
        tracing::info!("Results data written to {}", data_path.display());

        Ok((report_path, data_path))
    }
}
