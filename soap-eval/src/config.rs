//! Configuration management for the evaluation run
//!
//! Loads run settings from TOML files and provides runtime access. Every
//! section is optional in the file; missing values fall back to defaults.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    /// Image-id prefix -> reference file name (relative to `paths.references_dir`)
    #[serde(default = "default_reference_map")]
    pub references: IndexMap<String, String>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub weights: CompositeWeights,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

/// Input and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_references_dir")]
    pub references_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Markdown report file name inside `output_dir`
    #[serde(default = "default_report_file")]
    pub report_file: String,
    /// JSON dump file name inside `output_dir`
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            references_dir: default_references_dir(),
            output_dir: default_output_dir(),
            report_file: default_report_file(),
            data_file: default_data_file(),
        }
    }
}

/// What to do with a result file that cannot be read or parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Warn and continue with the next file
    #[default]
    Skip,
    /// Stop the whole run
    Abort,
}

/// Batch execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Prompt variant whose records feed the cross-model ranking
    #[serde(default = "default_primary_prompt")]
    pub primary_prompt: String,
    #[serde(default)]
    pub on_malformed: MalformedPolicy,
    /// Try to parse a note out of `output.raw_response` when `soap_note` is absent
    #[serde(default = "default_true")]
    pub recover_raw_response: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            primary_prompt: default_primary_prompt(),
            on_malformed: MalformedPolicy::default(),
            recover_raw_response: true,
        }
    }
}

/// Thresholds used by the text matchers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Fraction of phrase tokens that must appear for a bag-of-words match
    #[serde(default = "default_fuzzy_token_threshold")]
    pub fuzzy_token_threshold: f64,
    /// Fraction of impression tokens a diagnosis must share to count as grounded
    #[serde(default = "default_diagnosis_token_overlap")]
    pub diagnosis_token_overlap: f64,
    /// How deep the null-field walk descends into the note document
    #[serde(default = "default_null_scan_depth")]
    pub null_scan_depth: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_token_threshold: default_fuzzy_token_threshold(),
            diagnosis_token_overlap: default_diagnosis_token_overlap(),
            null_scan_depth: default_null_scan_depth(),
        }
    }
}

/// Weights of the composite ranking score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub schema_valid: f64,
    pub section_completeness: f64,
    pub highlight_recall: f64,
    pub symptom_recall: f64,
    pub diagnosis_grounded: f64,
    pub rouge_l: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            schema_valid: 0.15,
            section_completeness: 0.15,
            highlight_recall: 0.25,
            symptom_recall: 0.15,
            diagnosis_grounded: 0.15,
            rouge_l: 0.15,
        }
    }
}

/// Closed vocabularies used by the heuristic extractors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default = "default_symptoms")]
    pub symptoms: Vec<String>,
    /// Values of the labs/imaging field that mean "nothing reported"
    #[serde(default = "default_no_data_sentinels")]
    pub no_data_sentinels: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            symptoms: default_symptoms(),
            no_data_sentinels: default_no_data_sentinels(),
        }
    }
}

/// Symptom keywords matched as substrings of normalized text
pub const SYMPTOM_KEYWORDS: &[&str] = &[
    "pain",
    "fever",
    "cough",
    "nausea",
    "vomiting",
    "fatigue",
    "headache",
    "dizziness",
    "shortness of breath",
    "chest pain",
    "abdominal pain",
    "back pain",
    "sore throat",
    "runny nose",
    "congestion",
    "diarrhea",
    "diarrhoea",
    "constipation",
    "rash",
    "itching",
    "swelling",
    "bleeding",
    "weakness",
    "numbness",
    "chills",
    "wheeze",
    "palpitations",
    "insomnia",
    "weight loss",
];

pub const NO_DATA_SENTINELS: &[&str] = &["no data", "none", "n/a", "not available", "not documented"];

// Default value functions
fn default_true() -> bool { true }
fn default_results_dir() -> PathBuf { PathBuf::from("results") }
fn default_references_dir() -> PathBuf { PathBuf::from("references") }
fn default_output_dir() -> PathBuf { PathBuf::from("evaluation") }
fn default_report_file() -> String { "evaluation_report.md".to_string() }
fn default_data_file() -> String { "evaluation_results.json".to_string() }
fn default_primary_prompt() -> String { "soap".to_string() }
fn default_fuzzy_token_threshold() -> f64 { 0.7 }
fn default_diagnosis_token_overlap() -> f64 { 0.5 }
fn default_null_scan_depth() -> usize { 3 }
fn default_symptoms() -> Vec<String> { SYMPTOM_KEYWORDS.iter().map(|s| s.to_string()).collect() }
fn default_no_data_sentinels() -> Vec<String> { NO_DATA_SENTINELS.iter().map(|s| s.to_string()).collect() }

fn default_reference_map() -> IndexMap<String, String> {
    (1..=10)
        .map(|n| (format!("medical_note_{:02}", n), format!("{}.json", n)))
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            batch: BatchConfig::default(),
            references: default_reference_map(),
            matching: MatchingConfig::default(),
            weights: CompositeWeights::default(),
            vocabulary: VocabularyConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from the default config locations or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = ["config/eval.toml", "soap-eval/config/eval.toml"];

        for path in &config_paths {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path);
                    return config;
                }
                Err(e) => tracing::warn!("Ignoring {}: {}", path, e),
            }
        }

        tracing::info!("Using default configuration");
        Self::default()
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Resolve the reference file for a result file stem.
    ///
    /// The longest configured image-id prefix wins.
    pub fn reference_for(&self, file_stem: &str) -> Option<(&str, PathBuf)> {
        self.references
            .iter()
            .filter(|(prefix, _)| file_stem.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, file)| (prefix.as_str(), self.paths.references_dir.join(file)))
    }

    pub fn report_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.paths.report_file)
    }

    pub fn data_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.paths.data_file)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
