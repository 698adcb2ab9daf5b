//! Markdown evaluation report

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::analysis::{AggregatedResults, ComparisonEngine, EvaluationRecord, MetricSummary, ModelRanking};

/// Renders the human-readable report for one run
pub struct MarkdownWriter<'a> {
    engine: &'a ComparisonEngine,
    aggregated: &'a AggregatedResults,
    rankings: &'a [ModelRanking],
    generated_at: DateTime<Utc>,
}

impl<'a> MarkdownWriter<'a> {
    pub fn new(
        engine: &'a ComparisonEngine,
        aggregated: &'a AggregatedResults,
        rankings: &'a [ModelRanking],
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self { engine, aggregated, rankings, generated_at }
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.render(&mut file)?;
        file.flush()
    }

    /// Render the report into a string
    pub fn to_markdown(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.render(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn render<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "# SOAP Note Extraction Evaluation Report")?;
        writeln!(out)?;
        writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(out)?;
        writeln!(
            out,
            "Records evaluated: {} ({} generation errors) | Models: {} | Images: {} | Prompts: {}",
            self.aggregated.records.len(),
            self.aggregated.error_count(),
            self.aggregated.by_model.len(),
            self.aggregated.by_image.len(),
            self.aggregated.by_prompt.len()
        )?;
        writeln!(out)?;

        self.write_executive_summary(out)?;
        self.write_methodology(out)?;
        self.write_model_comparison(out)?;
        self.write_prompt_comparison(out)?;
        self.write_image_breakdown(out)?;
        self.write_hallucinations(out)?;
        self.write_latency(out)?;
        self.write_detailed_results(out)?;
        Ok(())
    }

    fn write_executive_summary<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "## Executive Summary")?;
        writeln!(out)?;
        writeln!(
            out,
            "Ranking over prompt `{}` records only.",
            cell(self.engine.primary_prompt())
        )?;
        writeln!(out)?;

        if self.rankings.is_empty() {
            writeln!(out, "No model produced records for the primary prompt.")?;
            writeln!(out)?;
            return Ok(());
        }

        writeln!(
            out,
            "| Rank | Model | Composite | Schema Valid | Completeness | Highlight Recall | Symptom Recall | Dx Grounded | ROUGE-L | Error Rate |"
        )?;
        writeln!(out, "|---:|---|---:|---:|---:|---:|---:|---:|---:|---:|")?;
        for ranking in self.rankings {
            let s = &ranking.summary;
            writeln!(
                out,
                "| {} | {} | {:.3} | {} | {} | {} | {} | {} | {:.3} | {} |",
                ranking.rank,
                cell(&ranking.model_name),
                s.composite,
                pct(s.schema_valid_rate),
                pct(s.avg_section_completeness),
                pct(s.avg_highlight_recall),
                pct(s.avg_symptom_recall),
                pct(s.diagnosis_grounded_rate),
                s.avg_rouge_l,
                pct(s.error_rate)
            )?;
        }
        writeln!(out)?;

        if let (Some(best), Some(worst)) = (self.rankings.first(), self.rankings.last()) {
            writeln!(out, "- **Best model:** {} ({:.3})", cell(&best.model_name), best.composite())?;
            if self.rankings.len() > 1 {
                writeln!(out, "- **Worst model:** {} ({:.3})", cell(&worst.model_name), worst.composite())?;
            }
        }
        writeln!(out)?;

        writeln!(out, "### Best per Metric")?;
        writeln!(out)?;
        for callout in self.engine.best_per_metric(self.rankings) {
            writeln!(
                out,
                "- **{}:** {} ({})",
                callout.metric,
                cell(&callout.model_name),
                pct(callout.value)
            )?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn write_methodology<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let w = self.engine.weights();
        writeln!(out, "## Methodology")?;
        writeln!(out)?;
        writeln!(out, "Each generated note is compared with the annotated reference consultation.")?;
        writeln!(out)?;
        for (name, definition) in METRIC_DEFINITIONS {
            writeln!(out, "- **{}**: {}", name, definition)?;
        }
        writeln!(out)?;
        writeln!(out, "Composite score per model:")?;
        writeln!(out)?;
        writeln!(out, "```")?;
        writeln!(
            out,
            "composite = ({:.2} * schemaValidRate + {:.2} * avgSectionCompleteness + {:.2} * avgHighlightRecall",
            w.schema_valid, w.section_completeness, w.highlight_recall
        )?;
        writeln!(
            out,
            "             + {:.2} * avgSymptomRecall + {:.2} * diagnosisGroundedRate + {:.2} * avgROUGE_L)",
            w.symptom_recall, w.diagnosis_grounded, w.rouge_l
        )?;
        writeln!(out, "            * (1 - errorRate)")?;
        writeln!(out, "```")?;
        writeln!(out)?;
        writeln!(
            out,
            "Averages use non-error records only. Rates use every record, errors included. \
             Only the `{}` prompt feeds the ranking.",
            cell(self.engine.primary_prompt())
        )?;
        writeln!(out)?;
        Ok(())
    }

    fn write_model_comparison<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "## Model Comparison (all prompts)")?;
        writeln!(out)?;
        write_summary_header(out, "Model")?;
        for (model, summary) in self.engine.model_summaries(self.aggregated) {
            write_summary_row(out, self.aggregated.model_name(&model), &summary)?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn write_prompt_comparison<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "## Prompt Comparison")?;
        writeln!(out)?;
        write_summary_header(out, "Prompt")?;
        for (prompt, summary) in self.engine.prompt_summaries(self.aggregated) {
            write_summary_row(out, self.aggregated.prompt_name(&prompt), &summary)?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn write_image_breakdown<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "## Per-Image Breakdown")?;
        writeln!(out)?;

        let breakdown = self.engine.image_breakdown(self.aggregated);
        for (image, indices) in &self.aggregated.by_image {
            writeln!(out, "### {}", cell(image))?;
            writeln!(out)?;

            if let Some(per_model) = breakdown.get(image).filter(|m| !m.is_empty()) {
                write_summary_header(out, "Model")?;
                for (model, summary) in per_model {
                    write_summary_row(out, self.aggregated.model_name(model), summary)?;
                }
                writeln!(out)?;
            }

            writeln!(out, "| Model | Prompt | Diagnosis | Confidence | Grounded | Halluc. Vitals | Halluc. Labs |")?;
            writeln!(out, "|---|---|---|---|:---:|:---:|:---:|")?;
            for record in self.aggregated.select(indices) {
                let diagnosis = if record.has_error {
                    "(error)".to_string()
                } else {
                    record.primary_diagnosis.as_deref().map(cell).unwrap_or_else(|| "-".to_string())
                };
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {} | {} |",
                    cell(&record.model_name),
                    cell(&record.prompt_name),
                    diagnosis,
                    record.diagnosis_confidence.as_deref().map(cell).unwrap_or_else(|| "-".to_string()),
                    flag(record.diagnosis_grounded),
                    flag(record.hallucinated_vitals),
                    flag(record.hallucinated_labs)
                )?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn write_hallucinations<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "## Hallucination Rates")?;
        writeln!(out)?;
        writeln!(out, "| Model | Records | Vitals | Labs | Negation Errors | Dx Grounded |")?;
        writeln!(out, "|---|---:|---:|---:|---:|---:|")?;
        for (model, summary) in self.engine.model_summaries(self.aggregated) {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} |",
                cell(self.aggregated.model_name(&model)),
                summary.count,
                pct(summary.hallucinated_vitals_rate),
                pct(summary.hallucinated_labs_rate),
                summary.total_negation_errors,
                pct(summary.diagnosis_grounded_rate)
            )?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn write_latency<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "## Latency")?;
        writeln!(out)?;
        writeln!(out, "Successful generations with a recorded latency only.")?;
        writeln!(out)?;
        writeln!(out, "| Model | Samples | Avg (s) | Min (s) | Max (s) |")?;
        writeln!(out, "|---|---:|---:|---:|---:|")?;
        for (model, summary) in self.engine.model_summaries(self.aggregated) {
            let name = cell(self.aggregated.model_name(&model));
            match summary.latency {
                Some(l) => writeln!(
                    out,
                    "| {} | {} | {:.2} | {:.2} | {:.2} |",
                    name, l.samples, l.avg_secs, l.min_secs, l.max_secs
                )?,
                None => writeln!(out, "| {} | 0 | - | - | - |", name)?,
            }
        }
        writeln!(out)?;
        Ok(())
    }

    fn write_detailed_results<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "## Detailed Results")?;
        writeln!(out)?;
        writeln!(
            out,
            "| Image | Model | Prompt | Schema | Complete | Null | Highlights | Negations | Symptoms | Vitals | Labs | Dx | ROUGE-L | Overlap | Latency (s) | Error |"
        )?;
        writeln!(out, "|---|---|---|:---:|---:|---:|---:|---:|---:|:---:|:---:|:---:|---:|---:|---:|---|")?;
        for record in &self.aggregated.records {
            write_record_row(out, record)?;
        }
        Ok(())
    }
}

const METRIC_DEFINITIONS: &[(&str, &str)] = &[
    ("Schema valid", "all four SOAP sections are present as keys"),
    ("Section completeness", "share of sections that are non-empty objects"),
    ("Null field ratio", "share of fields (walked three levels deep) that are null, blank or empty lists"),
    ("Highlight recall", "share of reference highlights found in the flattened note, verbatim or by 70% token overlap"),
    ("Negation preservation", "share of reference negations (\"no\", \"denies\", \"without\", ...) carried into the note; 1 when there are none"),
    ("Symptom recall", "share of reference symptom keywords found in the note; 1 when the reference has none"),
    ("Hallucinated vitals", "the note reports a vital sign the reference never mentions"),
    ("Hallucinated labs", "the note reports labs or imaging although the reference mentions none"),
    ("Diagnosis grounded", "the primary diagnosis matches the reference impression or a highlight"),
    ("ROUGE-L", "longest-common-subsequence F1 between reference and flattened note"),
    ("Word overlap", "Jaccard similarity of the two token sets"),
];

fn write_summary_header<W: Write>(out: &mut W, label: &str) -> std::io::Result<()> {
    writeln!(
        out,
        "| {} | Records | Errors | Composite | Schema Valid | Completeness | Null Ratio | Highlight Recall | Negation | Symptom Recall | Dx Grounded | ROUGE-L | Overlap |",
        label
    )?;
    writeln!(out, "|---|---:|---:|---:|---:|---:|---:|---:|---:|---:|---:|---:|---:|")
}

fn write_summary_row<W: Write>(out: &mut W, name: &str, s: &MetricSummary) -> std::io::Result<()> {
    writeln!(
        out,
        "| {} | {} | {} | {:.3} | {} | {} | {} | {} | {} | {} | {} | {:.3} | {:.3} |",
        cell(name),
        s.count,
        s.error_count,
        s.composite,
        pct(s.schema_valid_rate),
        pct(s.avg_section_completeness),
        pct(s.avg_null_field_ratio),
        pct(s.avg_highlight_recall),
        pct(s.avg_negation_preservation),
        pct(s.avg_symptom_recall),
        pct(s.diagnosis_grounded_rate),
        s.avg_rouge_l,
        s.avg_word_overlap
    )
}

fn write_record_row<W: Write>(out: &mut W, r: &EvaluationRecord) -> std::io::Result<()> {
    let latency = if r.latency_ms > 0.0 {
        format!("{:.2}", r.latency_ms / 1000.0)
    } else {
        "-".to_string()
    };
    writeln!(
        out,
        "| {} | {} | {} | {} | {} | {} | {}/{} | {}/{} | {} | {} | {} | {} | {:.3} | {:.3} | {} | {} |",
        cell(&r.image),
        cell(&r.model_name),
        cell(&r.prompt_name),
        flag(r.schema_valid),
        pct(r.section_completeness),
        pct(r.null_field_ratio),
        r.highlights_covered,
        r.highlights_total,
        r.negations_total - r.negation_errors,
        r.negations_total,
        pct(r.symptom_recall),
        flag(r.hallucinated_vitals),
        flag(r.hallucinated_labs),
        flag(r.diagnosis_grounded),
        r.rouge_l,
        r.word_overlap,
        latency,
        r.error_message.as_deref().map(cell).unwrap_or_default()
    )
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn flag(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Make free text safe inside a table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
