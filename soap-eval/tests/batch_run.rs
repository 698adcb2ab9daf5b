//! End-to-end batch runs over fixture directories.

use std::path::Path;

use serde_json::{json, Value};
use soap_eval::config::{Config, MalformedPolicy};
use soap_eval::notes::LoadError;
use soap_eval::reporting::JsonDump;
use soap_eval::runner::{BatchRunner, NoOpProgress, RunError};

// =============================================================================
// Fixtures
// =============================================================================

fn write_json(dir: &Path, name: &str, value: &Value) {
    std::fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn result(image: &str, prompt: &str, model: &str, output: Value) -> Value {
    json!({
        "metadata": {
            "image": image,
            "prompt": prompt,
            "promptName": prompt.to_uppercase(),
            "model": model,
            "modelName": format!("Model {}", model),
            "provider": "fixture",
            "timestamp": "2025-03-01T10:00:00Z",
            "latencyMs": 1800
        },
        "output": output
    })
}

fn headache_note() -> Value {
    json!({
        "subjective": {
            "chief_complaint": "Throbbing headache for 3 days",
            "history_of_present_illness": "No fever",
            "symptoms": ["headache", "nausea"],
            "patient_history": "None"
        },
        "objective": {
            "vitals": { "bp": "130/85" },
            "physical_exam": { "findings": ["neuro exam normal"] },
            "labs_imaging": "No data"
        },
        "assessment": {
            "primary_diagnosis": { "value": "Migraine", "confidence": "high" },
            "differential_diagnoses": ["Tension headache"]
        },
        "plan": {
            "medications": [{ "drug_name": "Ibuprofen", "dosage": "400mg" }],
            "patient_instructions": "Rest in a dark room"
        }
    })
}

/// Two references, five scorable results across two models and two prompts,
/// one result without a reference, one malformed file and one stray text file.
fn fixture() -> (tempfile::TempDir, Config) {
    let root = tempfile::tempdir().unwrap();
    let results = root.path().join("results");
    let references = root.path().join("references");
    std::fs::create_dir_all(&results).unwrap();
    std::fs::create_dir_all(&references).unwrap();

    write_json(
        &references,
        "1.json",
        &json!({
            "day": 1,
            "consultation": 1,
            "presenting_complaint": "headache",
            "note": "3 days of throbbing headache with nausea. No fever. BP 130/85.\nImp: Migraine\nPlan: ibuprofen",
            "highlights": ["throbbing headache", "nausea", "no fever"]
        }),
    );
    write_json(
        &references,
        "2.json",
        &json!({
            "day": 1,
            "consultation": 2,
            "presenting_complaint": "cough",
            "note": "Cough for a week, no shortness of breath. CXR clear.\nImp: viral bronchitis",
            "highlights": ["cough", "cxr clear"]
        }),
    );

    write_json(
        &results,
        "medical_note_01_soap_good.json",
        &result("medical_note_01", "soap", "good", json!({ "soap_note": headache_note() })),
    );
    write_json(
        &results,
        "medical_note_01_soap_weak.json",
        &result(
            "medical_note_01",
            "soap",
            "weak",
            json!({ "soap_note": {
                "subjective": { "chief_complaint": "Headache" },
                "objective": { "vitals": { "hr": "110" }, "labs_imaging": "CT head normal" }
            }}),
        ),
    );
    write_json(
        &results,
        "medical_note_02_soap_good.json",
        &result(
            "medical_note_02",
            "soap",
            "good",
            json!({ "soap_note": {
                "subjective": { "chief_complaint": "Cough for one week", "symptoms": ["cough"] },
                "objective": { "labs_imaging": "CXR clear" },
                "assessment": { "primary_diagnosis": { "value": "Acute viral bronchitis" } },
                "plan": { "patient_instructions": "Fluids and rest" }
            }}),
        ),
    );

    let mut failed = result("medical_note_02", "soap", "weak", Value::Null);
    failed["metadata"]["error"] = json!("timeout");
    write_json(&results, "medical_note_02_soap_weak.json", &failed);

    let raw = format!(
        "Here is the note:\n```json\n{}\n```",
        json!({ "subjective": { "chief_complaint": "Cough" } })
    );
    write_json(
        &results,
        "medical_note_02_freeform_good.json",
        &result("medical_note_02", "freeform", "good", json!({ "raw_response": raw })),
    );

    write_json(
        &results,
        "medical_note_03_soap_good.json",
        &result("medical_note_03", "soap", "good", json!({ "soap_note": headache_note() })),
    );
    std::fs::write(results.join("medical_note_01_soap_broken.json"), "{ \"metadata\": ").unwrap();
    std::fs::write(results.join("notes.txt"), "not a result").unwrap();

    let mut config = Config::default();
    config.paths.results_dir = results;
    config.paths.references_dir = references;
    config.paths.output_dir = root.path().join("evaluation");
    (root, config)
}

fn runner(config: &Config) -> BatchRunner<'_> {
    BatchRunner::new(config).unwrap().with_progress(Box::new(NoOpProgress))
}

// =============================================================================
// Evaluation
// =============================================================================

#[test]
fn test_skips_missing_reference_and_malformed_file() {
    let (_root, config) = fixture();
    let (records, skipped) = runner(&config).evaluate_all().unwrap();

    assert_eq!(records.len(), 5);
    assert_eq!(skipped.len(), 2);
    assert!(skipped.iter().any(|s| s.path.ends_with("medical_note_03_soap_good.json")));
    assert!(skipped.iter().any(|s| s.path.ends_with("medical_note_01_soap_broken.json")));
}

#[test]
fn test_abort_policy_stops_on_malformed_file() {
    let (_root, mut config) = fixture();
    config.batch.on_malformed = MalformedPolicy::Abort;
    let err = runner(&config).evaluate_all().unwrap_err();
    assert!(matches!(err, RunError::Load(LoadError::Json { .. })));
    assert!(err.to_string().contains("medical_note_01_soap_broken.json"));
}

#[test]
fn test_record_metrics() {
    let (_root, config) = fixture();
    let (records, _) = runner(&config).evaluate_all().unwrap();
    let find = |image: &str, prompt: &str, model: &str| {
        records
            .iter()
            .find(|r| r.image == image && r.prompt_id == prompt && r.model == model)
            .unwrap()
    };

    let good = find("medical_note_01", "soap", "good");
    assert!(!good.has_error);
    assert!(good.schema_valid);
    assert_eq!(good.section_completeness, 1.0);
    assert_eq!(good.highlight_recall, 1.0);
    assert_eq!(good.negation_errors, 0);
    assert!(!good.hallucinated_vitals);
    assert!(!good.hallucinated_labs);
    assert!(good.diagnosis_grounded);
    assert_eq!(good.model_name, "Model good");
    assert_eq!(good.latency_ms, 1800.0);

    let weak = find("medical_note_01", "soap", "weak");
    assert!(!weak.schema_valid);
    assert!(weak.hallucinated_vitals);
    assert!(weak.hallucinated_labs);
    assert!(!weak.diagnosis_grounded);

    let cough = find("medical_note_02", "soap", "good");
    assert!(!cough.hallucinated_labs);
    assert!(cough.diagnosis_grounded);

    let failed = find("medical_note_02", "soap", "weak");
    assert!(failed.has_error);
    assert_eq!(failed.error_message.as_deref(), Some("timeout"));

    let recovered = find("medical_note_02", "freeform", "good");
    assert!(!recovered.has_error);
    assert_eq!(recovered.highlights_covered, 1);
}

// =============================================================================
// Full run
// =============================================================================

#[test]
fn test_run_ranks_and_writes_outputs() {
    let (_root, config) = fixture();
    let outcome = runner(&config).run().unwrap();

    let order: Vec<&str> = outcome.rankings.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(order, vec!["good", "weak"]);
    assert_eq!(outcome.rankings[0].summary.count, 2);
    assert_eq!(outcome.rankings[1].summary.error_rate, 0.5);

    assert_eq!(outcome.aggregated.by_prompt.len(), 2);
    assert_eq!(outcome.aggregated.by_image["medical_note_02"].len(), 3);

    let report = std::fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.contains("## Executive Summary"));
    assert!(report.contains("- **Best model:** Model good"));
    assert!(report.contains("## Detailed Results"));

    let dump = JsonDump::read_from_file(&outcome.data_path).unwrap();
    assert_eq!(dump.primary_prompt, "soap");
    let dumped: Vec<(usize, &str)> = dump.rankings.iter().map(|r| (r.rank, r.model.as_str())).collect();
    assert_eq!(dumped, vec![(1, "good"), (2, "weak")]);
    assert_eq!(dump.aggregated.records.len(), outcome.aggregated.records.len());
    assert_eq!(dump.aggregated.by_model, outcome.aggregated.by_model);
}

#[test]
fn test_primary_prompt_switch() {
    let (_root, mut config) = fixture();
    config.batch.primary_prompt = "freeform".to_string();
    let outcome = runner(&config).run().unwrap();

    assert_eq!(outcome.rankings.len(), 1);
    assert_eq!(outcome.rankings[0].model, "good");
    assert_eq!(outcome.rankings[0].summary.count, 1);
}

#[test]
fn test_raw_recovery_disabled_turns_into_error_record() {
    let (_root, mut config) = fixture();
    config.batch.recover_raw_response = false;
    let (records, _) = runner(&config).evaluate_all().unwrap();
    let freeform = records.iter().find(|r| r.prompt_id == "freeform").unwrap();
    assert!(freeform.has_error);
}

#[test]
fn test_missing_results_dir() {
    let (root, mut config) = fixture();
    config.paths.results_dir = root.path().join("nowhere");
    assert!(matches!(runner(&config).run(), Err(RunError::MissingResultsDir(_))));
    assert!(!config.paths.output_dir.exists());
}

#[test]
fn test_empty_results_dir_still_writes_report() {
    let root = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.paths.results_dir = root.path().to_path_buf();
    config.paths.output_dir = root.path().join("out");

    let outcome = runner(&config).run().unwrap();
    assert!(outcome.rankings.is_empty());
    assert!(outcome.report_path.exists());
    assert!(outcome.data_path.exists());
}
