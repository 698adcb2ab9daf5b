//! Reference annotations, model outputs and the structured note schema

pub mod lenient;
pub mod loader;

pub use loader::{
    discover_result_files, load_candidate, load_reference, LoadError, ReferenceCache, ResultFile,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Labs/imaging value that means nothing was reported; skipped when flattening
pub const NO_DATA_SENTINEL: &str = "no data";

/// The four top-level sections, in flattening order
pub const SECTION_NAMES: [&str; 4] = ["subjective", "objective", "assessment", "plan"];

/// One annotated ground-truth consultation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    #[serde(default)]
    pub day: u32,
    #[serde(default)]
    pub consultation: u32,
    #[serde(default)]
    pub presenting_complaint: String,
    #[serde(default)]
    pub note: String,
    /// Key facts a correct extraction must surface
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// Identifying metadata of one generated output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMetadata {
    pub image: String,
    pub prompt: String,
    #[serde(default)]
    pub prompt_name: String,
    pub model: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Payload of a generated output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputPayload {
    #[serde(default)]
    pub soap_note: Option<Value>,
    #[serde(default)]
    pub raw_response: Option<String>,
}

/// One model-produced result as stored in a batch result file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateOutput {
    pub metadata: CandidateMetadata,
    #[serde(default)]
    pub output: Option<OutputPayload>,
}

impl CandidateOutput {
    /// The note document carried by this output, if any.
    ///
    /// With `recover_raw` set, a JSON object embedded in `raw_response` is
    /// used when `soap_note` is missing or null.
    pub fn note_document(&self, recover_raw: bool) -> Option<Value> {
        let output = self.output.as_ref()?;
        match &output.soap_note {
            Some(Value::Null) | None => {}
            Some(note) => return Some(note.clone()),
        }
        if !recover_raw {
            return None;
        }
        output.raw_response.as_deref().and_then(recover_note_from_raw)
    }
}

/// Pull a note object out of a free-text model response.
///
/// Accepts a bare JSON object or one wrapped in prose or code fences, and
/// unwraps a top-level `soap_note` member when present. Returns `None` unless
/// the object carries at least one of the four sections.
pub fn recover_note_from_raw(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let mut value: Value = serde_json::from_str(&raw[start..=end]).ok()?;
    if let Some(inner) = value.get_mut("soap_note").map(Value::take) {
        value = inner;
    }
    let object = value.as_object()?;
    if SECTION_NAMES.iter().any(|name| object.contains_key(*name)) {
        Some(value)
    } else {
        None
    }
}

/// The schema under evaluation: four optional sections
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StructuredNote {
    #[serde(default, deserialize_with = "lenient::object")]
    pub subjective: Option<Subjective>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub objective: Option<Objective>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub assessment: Option<Assessment>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub plan: Option<Plan>,
}

/// Subjective section; `hpi` and `past_medical_history` are accepted as alternate keys
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "SubjectiveRepr")]
pub struct Subjective {
    pub chief_complaint: Option<String>,
    pub history_of_present_illness: Option<String>,
    pub symptoms: Vec<String>,
    pub patient_history: Option<String>,
}

#[derive(Deserialize)]
struct SubjectiveRepr {
    #[serde(default, deserialize_with = "lenient::text")]
    chief_complaint: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    history_of_present_illness: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    hpi: Option<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    symptoms: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    patient_history: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    past_medical_history: Option<String>,
}

impl From<SubjectiveRepr> for Subjective {
    fn from(repr: SubjectiveRepr) -> Self {
        Subjective {
            chief_complaint: repr.chief_complaint,
            history_of_present_illness: prefer([repr.history_of_present_illness, repr.hpi]),
            symptoms: repr.symptoms,
            patient_history: prefer([repr.patient_history, repr.past_medical_history]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "ObjectiveRepr")]
pub struct Objective {
    pub vitals: Option<Vitals>,
    pub physical_exam: Option<PhysicalExam>,
    pub labs_imaging: Option<String>,
}

#[derive(Deserialize)]
struct ObjectiveRepr {
    #[serde(default, deserialize_with = "lenient::object")]
    vitals: Option<Vitals>,
    #[serde(default, deserialize_with = "lenient::object")]
    physical_exam: Option<PhysicalExam>,
    #[serde(default, deserialize_with = "lenient::text")]
    labs_imaging: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    labs: Option<String>,
}

impl From<ObjectiveRepr> for Objective {
    fn from(repr: ObjectiveRepr) -> Self {
        Objective {
            vitals: repr.vitals,
            physical_exam: repr.physical_exam,
            labs_imaging: prefer([repr.labs_imaging, repr.labs]),
        }
    }
}

/// Vital signs; the spelled-out key names are accepted next to the short ones
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "VitalsRepr")]
pub struct Vitals {
    pub bp: Option<String>,
    pub hr: Option<String>,
    pub temp: Option<String>,
    pub rr: Option<String>,
    pub weight: Option<String>,
}

#[derive(Deserialize)]
struct VitalsRepr {
    #[serde(default, deserialize_with = "lenient::text")]
    bp: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    blood_pressure: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    hr: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    heart_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pulse: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    temp: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    temperature: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    rr: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    respiratory_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    weight: Option<String>,
}

impl From<VitalsRepr> for Vitals {
    fn from(repr: VitalsRepr) -> Self {
        Vitals {
            bp: prefer([repr.bp, repr.blood_pressure]),
            hr: prefer([repr.hr, repr.heart_rate, repr.pulse]),
            temp: prefer([repr.temp, repr.temperature]),
            rr: prefer([repr.rr, repr.respiratory_rate]),
            weight: repr.weight,
        }
    }
}

impl Vitals {
    /// Every reported (non-blank) vital, tagged by kind.
    pub fn reported(&self) -> Vec<(VitalKind, &str)> {
        [
            (VitalKind::BloodPressure, &self.bp),
            (VitalKind::HeartRate, &self.hr),
            (VitalKind::Temperature, &self.temp),
            (VitalKind::RespiratoryRate, &self.rr),
            (VitalKind::Weight, &self.weight),
        ]
        .into_iter()
        .filter_map(|(kind, value)| non_blank(value).map(|v| (kind, v)))
        .collect()
    }
}

/// Vital sign categories a note can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalKind {
    BloodPressure,
    HeartRate,
    Temperature,
    RespiratoryRate,
    Weight,
}

impl VitalKind {
    pub fn all() -> [VitalKind; 5] {
        [
            VitalKind::BloodPressure,
            VitalKind::HeartRate,
            VitalKind::Temperature,
            VitalKind::RespiratoryRate,
            VitalKind::Weight,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VitalKind::BloodPressure => "bp",
            VitalKind::HeartRate => "hr",
            VitalKind::Temperature => "temp",
            VitalKind::RespiratoryRate => "rr",
            VitalKind::Weight => "weight",
        }
    }
}

/// Physical exam; models emit either free text or an object
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "ExamRepr")]
pub struct PhysicalExam {
    pub findings: Vec<String>,
    pub raw_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExamRepr {
    Text(String),
    Detailed {
        #[serde(default, deserialize_with = "lenient::text_list")]
        findings: Vec<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        raw_text: Option<String>,
    },
}

impl From<ExamRepr> for PhysicalExam {
    fn from(repr: ExamRepr) -> Self {
        match repr {
            ExamRepr::Text(text) => PhysicalExam { findings: Vec::new(), raw_text: Some(text) },
            ExamRepr::Detailed { findings, raw_text } => PhysicalExam { findings, raw_text },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "AssessmentRepr")]
pub struct Assessment {
    pub primary_diagnosis: Option<Diagnosis>,
    pub differential_diagnoses: Vec<Diagnosis>,
}

#[derive(Deserialize)]
struct AssessmentRepr {
    #[serde(default, deserialize_with = "lenient::object")]
    primary_diagnosis: Option<Diagnosis>,
    #[serde(default, deserialize_with = "lenient::objects")]
    differential_diagnoses: Vec<Diagnosis>,
    #[serde(default, deserialize_with = "lenient::objects")]
    differential_diagnosis: Vec<Diagnosis>,
    #[serde(default, deserialize_with = "lenient::objects")]
    differentials: Vec<Diagnosis>,
}

impl From<AssessmentRepr> for Assessment {
    fn from(repr: AssessmentRepr) -> Self {
        let differential_diagnoses = [repr.differential_diagnoses, repr.differential_diagnosis, repr.differentials]
            .into_iter()
            .find(|list| !list.is_empty())
            .unwrap_or_default();
        Assessment { primary_diagnosis: repr.primary_diagnosis, differential_diagnoses }
    }
}

/// A diagnosis with the model's stated confidence and supporting quote
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "DiagnosisRepr")]
pub struct Diagnosis {
    pub value: Option<String>,
    pub confidence: Option<String>,
    pub supporting_evidence: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DiagnosisRepr {
    Text(String),
    Coded {
        #[serde(default, deserialize_with = "lenient::text")]
        value: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        diagnosis: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        name: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        confidence: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        supporting_evidence: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        evidence: Option<String>,
    },
}

impl From<DiagnosisRepr> for Diagnosis {
    fn from(repr: DiagnosisRepr) -> Self {
        match repr {
            DiagnosisRepr::Text(text) => Diagnosis { value: Some(text), ..Default::default() },
            DiagnosisRepr::Coded { value, diagnosis, name, confidence, supporting_evidence, evidence } => {
                Diagnosis {
                    value: prefer([value, diagnosis, name]),
                    confidence,
                    supporting_evidence: prefer([supporting_evidence, evidence]),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Plan {
    #[serde(default, deserialize_with = "lenient::objects")]
    pub medications: Vec<Medication>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub procedures: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub patient_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "MedicationRepr")]
pub struct Medication {
    pub drug_name: Option<String>,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MedicationRepr {
    Text(String),
    Detailed {
        #[serde(default, deserialize_with = "lenient::text")]
        drug_name: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        name: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        drug: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        dosage: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        dose: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        instructions: Option<String>,
    },
}

impl From<MedicationRepr> for Medication {
    fn from(repr: MedicationRepr) -> Self {
        match repr {
            MedicationRepr::Text(text) => Medication { drug_name: Some(text), ..Default::default() },
            MedicationRepr::Detailed { drug_name, name, drug, dosage, dose, instructions } => Medication {
                drug_name: prefer([drug_name, name, drug]),
                dosage: prefer([dosage, dose]),
                instructions,
            },
        }
    }
}

/// First non-blank value among a field's accepted keys, canonical key first.
fn prefer<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    let mut fallback = None;
    for value in candidates.into_iter().flatten() {
        if !value.trim().is_empty() {
            return Some(value);
        }
        fallback.get_or_insert(value);
    }
    fallback
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl StructuredNote {
    /// Typed view of a note document. Anything that is not an object reads as an empty note.
    pub fn from_document(document: &Value) -> Self {
        if !document.is_object() {
            return Self::default();
        }
        serde_json::from_value(document.clone()).unwrap_or_default()
    }

    pub fn vitals(&self) -> Option<&Vitals> {
        self.objective.as_ref()?.vitals.as_ref()
    }

    pub fn labs_imaging(&self) -> Option<&str> {
        non_blank(&self.objective.as_ref()?.labs_imaging)
    }

    pub fn primary_diagnosis(&self) -> Option<&Diagnosis> {
        self.assessment.as_ref()?.primary_diagnosis.as_ref()
    }

    /// Primary diagnosis text, if the model committed to one.
    pub fn primary_diagnosis_value(&self) -> Option<&str> {
        non_blank(&self.primary_diagnosis()?.value)
    }

    /// Concatenate every text-bearing field into one comparison string.
    ///
    /// Sections are visited subjective, objective, assessment, plan. Missing
    /// and null fields are skipped; so is a labs/imaging value equal to the
    /// "no data" sentinel.
    pub fn flatten(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut push = |value: &Option<String>| {
            if let Some(text) = non_blank(value) {
                parts.push(text.to_string());
            }
        };

        if let Some(s) = &self.subjective {
            push(&s.chief_complaint);
            push(&s.history_of_present_illness);
            if !s.symptoms.is_empty() {
                push(&Some(s.symptoms.join(", ")));
            }
            push(&s.patient_history);
        }

        if let Some(o) = &self.objective {
            if let Some(exam) = &o.physical_exam {
                if !exam.findings.is_empty() {
                    push(&Some(exam.findings.join(", ")));
                }
                push(&exam.raw_text);
            }
            let labs = o
                .labs_imaging
                .clone()
                .filter(|l| !l.trim().eq_ignore_ascii_case(NO_DATA_SENTINEL));
            push(&labs);
        }

        if let Some(a) = &self.assessment {
            if let Some(primary) = &a.primary_diagnosis {
                push(&primary.value);
            }
            for differential in &a.differential_diagnoses {
                push(&differential.value);
            }
        }

        if let Some(p) = &self.plan {
            for med in &p.medications {
                push(&med.drug_name);
                push(&med.dosage);
                push(&med.instructions);
            }
            if !p.procedures.is_empty() {
                push(&Some(p.procedures.join(", ")));
            }
            push(&p.patient_instructions);
        }

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_note() -> Value {
        json!({
            "subjective": {
                "chief_complaint": "Headache for 3 days",
                "history_of_present_illness": "Throbbing, worse in the morning",
                "symptoms": ["headache", "nausea"],
                "patient_history": null
            },
            "objective": {
                "vitals": { "bp": "130/85", "hr": 72, "temp": null },
                "physical_exam": { "findings": ["no neck stiffness"], "raw_text": "Alert" },
                "labs_imaging": "No data"
            },
            "assessment": {
                "primary_diagnosis": {
                    "value": "Migraine",
                    "confidence": "high",
                    "supporting_evidence": "Imp: Migraine"
                },
                "differential_diagnoses": ["Tension headache", { "value": "Sinusitis" }]
            },
            "plan": {
                "medications": [
                    { "drug_name": "Ibuprofen", "dosage": "400mg", "instructions": "with food" }
                ],
                "procedures": [],
                "patient_instructions": "Return if worse"
            }
        })
    }

    #[test]
    fn test_parse_full_note() {
        let note = StructuredNote::from_document(&full_note());
        let vitals = note.vitals().unwrap();
        assert_eq!(vitals.hr.as_deref(), Some("72"));
        assert_eq!(vitals.temp, None);
        assert_eq!(note.primary_diagnosis_value(), Some("Migraine"));
        assert_eq!(note.primary_diagnosis().unwrap().confidence.as_deref(), Some("high"));
        let differentials = &note.assessment.as_ref().unwrap().differential_diagnoses;
        assert_eq!(differentials.len(), 2);
        assert_eq!(differentials[0].value.as_deref(), Some("Tension headache"));
        assert_eq!(differentials[1].value.as_deref(), Some("Sinusitis"));
    }

    #[test]
    fn test_flatten_order_and_sentinel() {
        let note = StructuredNote::from_document(&full_note());
        let flat = note.flatten();
        assert_eq!(
            flat,
            "Headache for 3 days Throbbing, worse in the morning headache, nausea \
             no neck stiffness Alert Migraine Tension headache Sinusitis \
             Ibuprofen 400mg with food Return if worse"
        );
        assert!(!flat.contains("No data"));
    }

    #[test]
    fn test_flatten_partial_note() {
        let note = StructuredNote::from_document(&json!({
            "subjective": { "chief_complaint": "Cough" },
            "plan": null
        }));
        assert_eq!(note.flatten(), "Cough");
        assert_eq!(StructuredNote::from_document(&json!("not a note")).flatten(), "");
    }

    #[test]
    fn test_lenient_shapes() {
        let note = StructuredNote::from_document(&json!({
            "objective": { "physical_exam": "Chest clear", "labs": "FBC normal" },
            "assessment": { "primary_diagnosis": "Asthma" },
            "plan": { "medications": ["Salbutamol", 42], "procedures": "Spirometry" }
        }));
        let objective = note.objective.as_ref().unwrap();
        assert_eq!(objective.physical_exam.as_ref().unwrap().raw_text.as_deref(), Some("Chest clear"));
        assert_eq!(note.labs_imaging(), Some("FBC normal"));
        assert_eq!(note.primary_diagnosis_value(), Some("Asthma"));
        let plan = note.plan.as_ref().unwrap();
        assert_eq!(plan.medications.len(), 1);
        assert_eq!(plan.procedures, vec!["Spirometry"]);
    }

    #[test]
    fn test_alternate_and_canonical_keys_together_keep_sections() {
        let note = StructuredNote::from_document(&json!({
            "subjective": {
                "chief_complaint": "Chest pain",
                "hpi": "2 days",
                "history_of_present_illness": "Central, radiating to left arm"
            },
            "objective": {
                "vitals": { "hr": "110", "heart_rate": "108", "blood_pressure": "150/90" },
                "labs": "Troponin pending",
                "labs_imaging": "Troponin raised"
            },
            "assessment": {
                "primary_diagnosis": { "value": "ACS", "name": "Acute coronary syndrome" },
                "differentials": ["Pericarditis"]
            },
            "plan": { "medications": [{ "drug_name": "Aspirin", "name": "ASA", "dose": "300mg" }] }
        }));

        let subjective = note.subjective.as_ref().unwrap();
        assert_eq!(subjective.chief_complaint.as_deref(), Some("Chest pain"));
        assert_eq!(
            subjective.history_of_present_illness.as_deref(),
            Some("Central, radiating to left arm")
        );
        assert_eq!(
            note.vitals().unwrap().reported(),
            vec![(VitalKind::BloodPressure, "150/90"), (VitalKind::HeartRate, "110")]
        );
        assert_eq!(note.labs_imaging(), Some("Troponin raised"));
        assert_eq!(note.primary_diagnosis_value(), Some("ACS"));
        let assessment = note.assessment.as_ref().unwrap();
        assert_eq!(assessment.differential_diagnoses[0].value.as_deref(), Some("Pericarditis"));
        let medication = &note.plan.as_ref().unwrap().medications[0];
        assert_eq!(medication.drug_name.as_deref(), Some("Aspirin"));
        assert_eq!(medication.dosage.as_deref(), Some("300mg"));
        assert!(note.flatten().starts_with("Chest pain Central, radiating to left arm"));
    }

    #[test]
    fn test_blank_canonical_key_falls_back_to_alternate() {
        let note = StructuredNote::from_document(&json!({
            "objective": { "labs_imaging": "  ", "labs": "CXR clear" }
        }));
        assert_eq!(note.labs_imaging(), Some("CXR clear"));
    }

    #[test]
    fn test_reported_vitals() {
        let note = StructuredNote::from_document(&full_note());
        let reported = note.vitals().unwrap().reported();
        assert_eq!(
            reported,
            vec![(VitalKind::BloodPressure, "130/85"), (VitalKind::HeartRate, "72")]
        );
    }

    #[test]
    fn test_note_document_prefers_soap_note() {
        let candidate = CandidateOutput {
            metadata: CandidateMetadata::default(),
            output: Some(OutputPayload {
                soap_note: Some(json!({ "plan": {} })),
                raw_response: Some("{\"subjective\": {}}".to_string()),
            }),
        };
        assert_eq!(candidate.note_document(true), Some(json!({ "plan": {} })));
    }

    #[test]
    fn test_recover_note_from_fenced_raw_response() {
        let raw = "Here is the note:\n```json\n{\"soap_note\": {\"subjective\": {\"chief_complaint\": \"Rash\"}}}\n```";
        let candidate = CandidateOutput {
            metadata: CandidateMetadata::default(),
            output: Some(OutputPayload { soap_note: None, raw_response: Some(raw.to_string()) }),
        };
        let recovered = candidate.note_document(true).unwrap();
        assert_eq!(recovered["subjective"]["chief_complaint"], "Rash");
        assert_eq!(candidate.note_document(false), None);
    }

    #[test]
    fn test_recover_rejects_unrelated_json() {
        assert_eq!(recover_note_from_raw("{\"answer\": 42}"), None);
        assert_eq!(recover_note_from_raw("no json here"), None);
        assert_eq!(recover_note_from_raw("} backwards {"), None);
    }

    #[test]
    fn test_candidate_metadata_camel_case() {
        let candidate: CandidateOutput = serde_json::from_value(json!({
            "metadata": {
                "image": "medical_note_05",
                "prompt": "soap",
                "promptName": "SOAP v1",
                "model": "gpt-4o",
                "modelName": "GPT-4o",
                "provider": "openai",
                "timestamp": "2025-01-01T00:00:00Z",
                "latencyMs": 1830
            },
            "output": null
        }))
        .unwrap();
        assert_eq!(candidate.metadata.model_name, "GPT-4o");
        assert_eq!(candidate.metadata.latency_ms, Some(1830.0));
        assert!(candidate.output.is_none());
    }
}
