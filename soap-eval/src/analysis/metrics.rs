//! Per-record metric calculation
//!
//! [`MetricEvaluator::evaluate`] turns one (reference, candidate) pair into an
//! [`EvaluationRecord`]. Evaluation is pure: the result depends only on the
//! two inputs and the evaluator's settings.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::extractors::{extract_symptoms, ClinicalPatterns};
use super::similarity::{fuzzy_contains, rouge_l, word_overlap};
use super::text::{normalize, token_set};
use crate::config::{Config, MatchingConfig, VocabularyConfig};
use crate::notes::{CandidateOutput, ReferenceRecord, StructuredNote, SECTION_NAMES};

const MISSING_NOTE_MESSAGE: &str = "output contains no structured note";

/// Metrics for one (reference, candidate) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub image: String,
    pub model: String,
    pub model_name: String,
    pub prompt_id: String,
    pub prompt_name: String,
    pub provider: String,
    /// Wall-clock generation latency; 0 when unknown
    pub latency_ms: f64,

    pub has_error: bool,
    pub error_message: Option<String>,

    /// All four sections present as keys
    pub schema_valid: bool,
    /// Fraction of sections present and non-empty (0.0 - 1.0)
    pub section_completeness: f64,
    /// Fraction of leaves that are null, empty or blank (0.0 - 1.0)
    pub null_field_ratio: f64,

    pub highlight_recall: f64,
    pub highlights_covered: usize,
    pub highlights_total: usize,

    pub negation_preservation_rate: f64,
    pub negation_errors: usize,
    pub negations_total: usize,

    pub symptom_recall: f64,

    pub hallucinated_vitals: bool,
    pub hallucinated_labs: bool,

    pub diagnosis_grounded: bool,
    pub primary_diagnosis: Option<String>,
    pub diagnosis_confidence: Option<String>,

    pub rouge_l: f64,
    pub word_overlap: f64,
}

impl EvaluationRecord {
    /// A record for a failed generation: every quality metric at its worst value.
    pub fn failed(candidate: &CandidateOutput, message: impl Into<String>) -> Self {
        Self {
            has_error: true,
            error_message: Some(message.into()),
            ..Self::identified(candidate)
        }
    }

    /// Identity fields from the candidate metadata; metrics at their worst values.
    fn identified(candidate: &CandidateOutput) -> Self {
        let meta = &candidate.metadata;
        Self {
            image: meta.image.clone(),
            model: meta.model.clone(),
            model_name: display_name(&meta.model_name, &meta.model),
            prompt_id: meta.prompt.clone(),
            prompt_name: display_name(&meta.prompt_name, &meta.prompt),
            provider: meta.provider.clone(),
            latency_ms: meta.latency_ms.unwrap_or(0.0),
            has_error: false,
            error_message: None,
            schema_valid: false,
            section_completeness: 0.0,
            null_field_ratio: 1.0,
            highlight_recall: 0.0,
            highlights_covered: 0,
            highlights_total: 0,
            negation_preservation_rate: 0.0,
            negation_errors: 0,
            negations_total: 0,
            symptom_recall: 0.0,
            hallucinated_vitals: false,
            hallucinated_labs: false,
            diagnosis_grounded: false,
            primary_diagnosis: None,
            diagnosis_confidence: None,
            rouge_l: 0.0,
            word_overlap: 0.0,
        }
    }

    /// Values that must lie in [0, 1], by name
    pub fn ratios(&self) -> [(&'static str, f64); 7] {
        [
            ("section_completeness", self.section_completeness),
            ("null_field_ratio", self.null_field_ratio),
            ("highlight_recall", self.highlight_recall),
            ("negation_preservation_rate", self.negation_preservation_rate),
            ("symptom_recall", self.symptom_recall),
            ("rouge_l", self.rouge_l),
            ("word_overlap", self.word_overlap),
        ]
    }
}

fn display_name(name: &str, fallback: &str) -> String {
    if name.trim().is_empty() {
        fallback.to_string()
    } else {
        name.to_string()
    }
}

/// Scores candidates against references
#[derive(Debug, Clone)]
pub struct MetricEvaluator {
    matching: MatchingConfig,
    vocabulary: VocabularyConfig,
    recover_raw_response: bool,
    patterns: ClinicalPatterns,
}

impl MetricEvaluator {
    pub fn new(matching: MatchingConfig, vocabulary: VocabularyConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            matching,
            vocabulary,
            recover_raw_response: true,
            patterns: ClinicalPatterns::new()?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, regex::Error> {
        Ok(Self::new(config.matching.clone(), config.vocabulary.clone())?
            .with_raw_recovery(config.batch.recover_raw_response))
    }

    pub fn with_raw_recovery(mut self, enabled: bool) -> Self {
        self.recover_raw_response = enabled;
        self
    }

    fn fuzzy(&self, haystack: &str, phrase: &str) -> bool {
        fuzzy_contains(haystack, phrase, self.matching.fuzzy_token_threshold)
    }

    /// Evaluate one candidate against its reference
    pub fn evaluate(&self, reference: &ReferenceRecord, candidate: &CandidateOutput) -> EvaluationRecord {
        if let Some(error) = &candidate.metadata.error {
            return EvaluationRecord::failed(candidate, error.clone());
        }
        let document = match candidate.note_document(self.recover_raw_response) {
            Some(document) => document,
            None => return EvaluationRecord::failed(candidate, MISSING_NOTE_MESSAGE),
        };

        let note = StructuredNote::from_document(&document);
        let flat = note.flatten();
        let ref_note = reference.note.as_str();

        let (highlights_covered, highlights_total) = self.highlight_coverage(&flat, &reference.highlights);
        let (negations_preserved, negations_total) = self.negation_coverage(ref_note, &flat);
        let primary = note.primary_diagnosis();

        let mut record = EvaluationRecord::identified(candidate);
        record.schema_valid = schema_valid(&document);
        record.section_completeness = section_completeness(&document);
        record.null_field_ratio = null_field_ratio(&document, self.matching.null_scan_depth);
        record.highlight_recall = ratio_or(highlights_covered, highlights_total, 0.0);
        record.highlights_covered = highlights_covered;
        record.highlights_total = highlights_total;
        record.negation_preservation_rate = ratio_or(negations_preserved, negations_total, 1.0);
        record.negation_errors = negations_total - negations_preserved;
        record.negations_total = negations_total;
        record.symptom_recall = self.symptom_recall(ref_note, &flat);
        record.hallucinated_vitals = self.hallucinated_vitals(ref_note, &note);
        record.hallucinated_labs = self.hallucinated_labs(ref_note, &note);
        record.diagnosis_grounded = self.diagnosis_grounded(reference, &note);
        record.primary_diagnosis = note.primary_diagnosis_value().map(String::from);
        record.diagnosis_confidence = primary.and_then(|d| d.confidence.clone());
        record.rouge_l = rouge_l(ref_note, &flat);
        record.word_overlap = word_overlap(ref_note, &flat);
        record
    }

    fn highlight_coverage(&self, flat: &str, highlights: &[String]) -> (usize, usize) {
        let covered = highlights.iter().filter(|h| self.fuzzy(flat, h)).count();
        (covered, highlights.len())
    }

    fn negation_coverage(&self, reference_note: &str, flat: &str) -> (usize, usize) {
        let negations = self.patterns.extract_negations(reference_note);
        let preserved = negations.iter().filter(|n| self.fuzzy(flat, n)).count();
        (preserved, negations.len())
    }

    /// Share of reference symptom keywords also found in the candidate.
    ///
    /// A reference with no detectable symptom keywords scores 1.0 when a note
    /// exists (benefit of the doubt); this inflates scores for vitals-only or
    /// diagnosis-only consultations.
    pub fn symptom_recall(&self, reference_note: &str, flat: &str) -> f64 {
        let expected = extract_symptoms(reference_note, &self.vocabulary.symptoms);
        if expected.is_empty() {
            return 1.0;
        }
        let found: HashSet<String> = extract_symptoms(flat, &self.vocabulary.symptoms)
            .into_iter()
            .collect();
        let matched = expected.iter().filter(|s| found.contains(*s)).count();
        matched as f64 / expected.len() as f64
    }

    /// Any reported vital whose kind the reference never mentions.
    pub fn hallucinated_vitals(&self, reference_note: &str, note: &StructuredNote) -> bool {
        note.vitals()
            .map(|vitals| {
                vitals
                    .reported()
                    .iter()
                    .any(|(kind, _)| !self.patterns.mentions_vital(reference_note, *kind))
            })
            .unwrap_or(false)
    }

    /// Labs/imaging reported although the reference mentions none.
    pub fn hallucinated_labs(&self, reference_note: &str, note: &StructuredNote) -> bool {
        let Some(labs) = note.labs_imaging() else {
            return false;
        };
        let is_sentinel = self
            .vocabulary
            .no_data_sentinels
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(labs.trim()));
        !is_sentinel && !self.patterns.mentions_labs(reference_note)
    }

    /// Primary diagnosis traceable to the reference impression or a highlight.
    pub fn diagnosis_grounded(&self, reference: &ReferenceRecord, note: &StructuredNote) -> bool {
        let Some(diagnosis) = note.primary_diagnosis_value() else {
            return false;
        };
        let diagnosis_norm = normalize(diagnosis);
        if diagnosis_norm.is_empty() {
            return false;
        }

        if let Some(impression) = self.patterns.impression(&reference.note) {
            let impression_norm = normalize(impression);
            if !impression_norm.is_empty() {
                if diagnosis_norm.contains(&impression_norm) || impression_norm.contains(&diagnosis_norm) {
                    return true;
                }
                let impression_tokens = token_set(&impression_norm);
                let diagnosis_tokens = token_set(&diagnosis_norm);
                let shared = impression_tokens.intersection(&diagnosis_tokens).count();
                if shared as f64 / impression_tokens.len() as f64 >= self.matching.diagnosis_token_overlap {
                    return true;
                }
            }
        }

        reference
            .highlights
            .iter()
            .any(|h| self.fuzzy(h, diagnosis) || self.fuzzy(diagnosis, h))
    }
}

fn ratio_or(numerator: usize, denominator: usize, empty: f64) -> f64 {
    if denominator == 0 {
        empty
    } else {
        numerator as f64 / denominator as f64
    }
}

/// All four sections present as keys; content is not inspected.
pub fn schema_valid(document: &Value) -> bool {
    document
        .as_object()
        .map(|o| SECTION_NAMES.iter().all(|name| o.contains_key(*name)))
        .unwrap_or(false)
}

/// Fraction of sections that are present and non-empty objects.
pub fn section_completeness(document: &Value) -> f64 {
    let Some(object) = document.as_object() else {
        return 0.0;
    };
    let complete = SECTION_NAMES
        .iter()
        .filter(|name| {
            object
                .get(**name)
                .and_then(Value::as_object)
                .map(|section| !section.is_empty())
                .unwrap_or(false)
        })
        .count();
    complete as f64 / SECTION_NAMES.len() as f64
}

/// Fraction of scalar leaves and lists that carry nothing.
///
/// Objects are walked down to `max_depth` levels. A leaf is empty when null
/// or a blank string; a list is empty when it has no items. A document with
/// nothing to count is fully null.
pub fn null_field_ratio(document: &Value, max_depth: usize) -> f64 {
    let mut counts = NullCounts::default();
    if let Value::Object(object) = document {
        for value in object.values() {
            counts.visit(value, 1, max_depth);
        }
    }
    if counts.total == 0 {
        1.0
    } else {
        counts.empty as f64 / counts.total as f64
    }
}

#[derive(Default)]
struct NullCounts {
    total: usize,
    empty: usize,
}

impl NullCounts {
    fn visit(&mut self, value: &Value, depth: usize, max_depth: usize) {
        match value {
            Value::Object(object) => {
                if depth < max_depth {
                    for child in object.values() {
                        self.visit(child, depth + 1, max_depth);
                    }
                }
            }
            Value::Array(items) => self.count(items.is_empty()),
            Value::Null => self.count(true),
            Value::String(s) => self.count(s.trim().is_empty()),
            Value::Bool(_) | Value::Number(_) => self.count(false),
        }
    }

    fn count(&mut self, empty: bool) {
        self.total += 1;
        if empty {
            self.empty += 1;
        }
    }
}
