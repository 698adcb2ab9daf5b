//! Summary statistics and the composite ranking score

use serde::{Deserialize, Serialize};

use super::metrics::EvaluationRecord;
use crate::config::CompositeWeights;

/// Latency of successful generations, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub avg_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
    pub samples: usize,
}

impl LatencyStats {
    /// `None` when no non-error record has a positive latency.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a EvaluationRecord>) -> Option<Self> {
        let secs: Vec<f64> = records
            .into_iter()
            .filter(|r| !r.has_error && r.latency_ms > 0.0)
            .map(|r| r.latency_ms / 1000.0)
            .collect();
        if secs.is_empty() {
            return None;
        }
        Some(Self {
            avg_secs: secs.iter().sum::<f64>() / secs.len() as f64,
            min_secs: secs.iter().copied().fold(f64::INFINITY, f64::min),
            max_secs: secs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            samples: secs.len(),
        })
    }
}

/// Statistics over a group of evaluation records.
///
/// Rates use every record (errors included) over `max(count, 1)`; averages
/// use the non-error records only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub count: usize,
    pub error_count: usize,
    pub error_rate: f64,

    pub schema_valid_rate: f64,
    pub diagnosis_grounded_rate: f64,
    pub hallucinated_vitals_rate: f64,
    pub hallucinated_labs_rate: f64,

    pub avg_section_completeness: f64,
    pub avg_null_field_ratio: f64,
    pub avg_highlight_recall: f64,
    pub avg_negation_preservation: f64,
    pub total_negation_errors: usize,
    pub avg_symptom_recall: f64,
    pub avg_rouge_l: f64,
    pub avg_word_overlap: f64,

    pub latency: Option<LatencyStats>,
    pub composite: f64,
}

impl MetricSummary {
    pub fn from_records<'a, I>(records: I, weights: &CompositeWeights) -> Self
    where
        I: IntoIterator<Item = &'a EvaluationRecord>,
    {
        let all: Vec<&EvaluationRecord> = records.into_iter().collect();
        let ok: Vec<&EvaluationRecord> = all.iter().copied().filter(|r| !r.has_error).collect();

        let count = all.len();
        let error_count = count - ok.len();
        let rate = |pred: fn(&EvaluationRecord) -> bool| {
            all.iter().filter(|r| pred(r)).count() as f64 / count.max(1) as f64
        };
        let avg = |value: fn(&EvaluationRecord) -> f64| mean(ok.iter().map(|r| value(r)));

        let mut summary = Self {
            count,
            error_count,
            error_rate: error_count as f64 / count.max(1) as f64,
            schema_valid_rate: rate(|r| r.schema_valid),
            diagnosis_grounded_rate: rate(|r| r.diagnosis_grounded),
            hallucinated_vitals_rate: rate(|r| r.hallucinated_vitals),
            hallucinated_labs_rate: rate(|r| r.hallucinated_labs),
            avg_section_completeness: avg(|r| r.section_completeness),
            avg_null_field_ratio: avg(|r| r.null_field_ratio),
            avg_highlight_recall: avg(|r| r.highlight_recall),
            avg_negation_preservation: avg(|r| r.negation_preservation_rate),
            total_negation_errors: ok.iter().map(|r| r.negation_errors).sum(),
            avg_symptom_recall: avg(|r| r.symptom_recall),
            avg_rouge_l: avg(|r| r.rouge_l),
            avg_word_overlap: avg(|r| r.word_overlap),
            latency: LatencyStats::from_records(all.iter().copied()),
            composite: 0.0,
        };
        summary.composite = summary.composite_score(weights);
        summary
    }

    /// Weighted quality score, scaled down by the error rate.
    pub fn composite_score(&self, weights: &CompositeWeights) -> f64 {
        let quality = weights.schema_valid * self.schema_valid_rate
            + weights.section_completeness * self.avg_section_completeness
            + weights.highlight_recall * self.avg_highlight_recall
            + weights.symptom_recall * self.avg_symptom_recall
            + weights.diagnosis_grounded * self.diagnosis_grounded_rate
            + weights.rouge_l * self.avg_rouge_l;
        quality * (1.0 - self.error_rate)
    }

    /// Named values for "best model per metric" callouts; higher is better.
    pub fn callout_metrics(&self) -> [(&'static str, f64); 7] {
        [
            ("Schema validity", self.schema_valid_rate),
            ("Section completeness", self.avg_section_completeness),
            ("Highlight recall", self.avg_highlight_recall),
            ("Negation preservation", self.avg_negation_preservation),
            ("Symptom recall", self.avg_symptom_recall),
            ("Diagnosis grounding", self.diagnosis_grounded_rate),
            ("ROUGE-L", self.avg_rouge_l),
        ]
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
