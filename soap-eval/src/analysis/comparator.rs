//! Cross-model grouping and ranking

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::metrics::EvaluationRecord;
use super::scoring::MetricSummary;
use crate::config::CompositeWeights;

/// Every evaluation record of a run, indexed three ways.
///
/// Group maps hold positions into `records` and keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResults {
    pub records: Vec<EvaluationRecord>,
    pub by_model: IndexMap<String, Vec<usize>>,
    pub by_image: IndexMap<String, Vec<usize>>,
    pub by_prompt: IndexMap<String, Vec<usize>>,
}

impl AggregatedResults {
    pub fn new(records: Vec<EvaluationRecord>) -> Self {
        let mut by_model: IndexMap<String, Vec<usize>> = IndexMap::new();
        let mut by_image: IndexMap<String, Vec<usize>> = IndexMap::new();
        let mut by_prompt: IndexMap<String, Vec<usize>> = IndexMap::new();

        for (idx, record) in records.iter().enumerate() {
            by_model.entry(record.model.clone()).or_default().push(idx);
            by_image.entry(record.image.clone()).or_default().push(idx);
            by_prompt.entry(record.prompt_id.clone()).or_default().push(idx);
        }

        Self { records, by_model, by_image, by_prompt }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolve a group's indices to records
    pub fn select<'a>(&'a self, indices: &'a [usize]) -> impl Iterator<Item = &'a EvaluationRecord> + 'a {
        indices.iter().filter_map(move |&idx| self.records.get(idx))
    }

    /// Display name of a model, falling back to its id
    pub fn model_name<'a>(&'a self, model: &'a str) -> &'a str {
        self.by_model
            .get(model)
            .and_then(|indices| self.select(indices).next())
            .map(|r| r.model_name.as_str())
            .unwrap_or(model)
    }

    /// Display name of a prompt variant, falling back to its id
    pub fn prompt_name<'a>(&'a self, prompt: &'a str) -> &'a str {
        self.by_prompt
            .get(prompt)
            .and_then(|indices| self.select(indices).next())
            .map(|r| r.prompt_name.as_str())
            .unwrap_or(prompt)
    }

    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| r.has_error).count()
    }
}

/// A model's place in the cross-model ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRanking {
    pub rank: usize,
    pub model: String,
    pub model_name: String,
    pub summary: MetricSummary,
}

impl ModelRanking {
    pub fn composite(&self) -> f64 {
        self.summary.composite
    }
}

/// The best-performing model for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCallout {
    pub metric: String,
    pub model_name: String,
    pub value: f64,
}

/// Groups, summarizes and ranks evaluation records
#[derive(Debug, Clone)]
pub struct ComparisonEngine {
    weights: CompositeWeights,
    primary_prompt: String,
}

impl ComparisonEngine {
    pub fn new(primary_prompt: impl Into<String>) -> Self {
        Self {
            weights: CompositeWeights::default(),
            primary_prompt: primary_prompt.into(),
        }
    }

    /// Create with custom weights
    pub fn with_weights(mut self, weights: CompositeWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &CompositeWeights {
        &self.weights
    }

    pub fn primary_prompt(&self) -> &str {
        &self.primary_prompt
    }

    /// Group a complete set of records
    pub fn aggregate(&self, records: Vec<EvaluationRecord>) -> AggregatedResults {
        AggregatedResults::new(records)
    }

    pub fn summarize<'a>(&self, records: impl IntoIterator<Item = &'a EvaluationRecord>) -> MetricSummary {
        MetricSummary::from_records(records, &self.weights)
    }

    /// Rank models by composite score over their primary-prompt records.
    ///
    /// Models with no primary-prompt record are left out. Equal scores keep
    /// first-seen order.
    pub fn rank_models(&self, results: &AggregatedResults) -> Vec<ModelRanking> {
        let mut rankings: Vec<ModelRanking> = results
            .by_model
            .iter()
            .filter_map(|(model, indices)| {
                let primary: Vec<&EvaluationRecord> = results
                    .select(indices)
                    .filter(|r| r.prompt_id == self.primary_prompt)
                    .collect();
                if primary.is_empty() {
                    return None;
                }
                Some(ModelRanking {
                    rank: 0,
                    model: model.clone(),
                    model_name: results.model_name(model).to_string(),
                    summary: self.summarize(primary),
                })
            })
            .collect();

        // Sort by composite score descending
        rankings.sort_by(|a, b| {
            b.composite()
                .partial_cmp(&a.composite())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for (idx, ranking) in rankings.iter_mut().enumerate() {
            ranking.rank = idx + 1;
        }
        rankings
    }

    /// Summary per model over every prompt variant
    pub fn model_summaries(&self, results: &AggregatedResults) -> IndexMap<String, MetricSummary> {
        self.summaries(results, &results.by_model)
    }

    /// Summary per prompt variant over every model
    pub fn prompt_summaries(&self, results: &AggregatedResults) -> IndexMap<String, MetricSummary> {
        self.summaries(results, &results.by_prompt)
    }

    /// Summary per source image over every model and prompt
    pub fn image_summaries(&self, results: &AggregatedResults) -> IndexMap<String, MetricSummary> {
        self.summaries(results, &results.by_image)
    }

    /// Per image, one summary per model over that image's primary-prompt records
    pub fn image_breakdown(
        &self,
        results: &AggregatedResults,
    ) -> IndexMap<String, IndexMap<String, MetricSummary>> {
        results
            .by_image
            .iter()
            .map(|(image, indices)| {
                let mut per_model: IndexMap<String, Vec<&EvaluationRecord>> = IndexMap::new();
                for record in results.select(indices).filter(|r| r.prompt_id == self.primary_prompt) {
                    per_model.entry(record.model.clone()).or_default().push(record);
                }
                let summaries = per_model
                    .into_iter()
                    .map(|(model, records)| (model, self.summarize(records)))
                    .collect();
                (image.clone(), summaries)
            })
            .collect()
    }

    /// Highest-scoring ranked model for each callout metric; first in rank order wins ties.
    pub fn best_per_metric(&self, rankings: &[ModelRanking]) -> Vec<MetricCallout> {
        let Some(first) = rankings.first() else {
            return Vec::new();
        };

        first
            .summary
            .callout_metrics()
            .iter()
            .enumerate()
            .map(|(slot, (metric, _))| {
                let mut best = first;
                let mut best_value = first.summary.callout_metrics()[slot].1;
                for ranking in &rankings[1..] {
                    let value = ranking.summary.callout_metrics()[slot].1;
                    if value > best_value {
                        best = ranking;
                        best_value = value;
                    }
                }
                MetricCallout {
                    metric: metric.to_string(),
                    model_name: best.model_name.clone(),
                    value: best_value,
                }
            })
            .collect()
    }

    fn summaries(
        &self,
        results: &AggregatedResults,
        groups: &IndexMap<String, Vec<usize>>,
    ) -> IndexMap<String, MetricSummary> {
        groups
            .iter()
            .map(|(key, indices)| (key.clone(), self.summarize(results.select(indices))))
            .collect()
    }
}
