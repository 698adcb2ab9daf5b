//! Heuristic clinical-language extractors
//!
//! Pattern tables are plain constants; [`ClinicalPatterns`] compiles them once
//! per run.

use regex::{Regex, RegexSet};

use super::text::normalize;
use crate::notes::VitalKind;

/// Negation cues followed by one or two words
pub const NEGATION_PATTERNS: &[&str] = &[
    r"\bno\s+\w+(?:\s+\w+)?",
    r"\bnil\s+\w+(?:\s+\w+)?",
    r"\bdenies\s+\w+(?:\s+\w+)?",
    r"\bwithout\s+\w+(?:\s+\w+)?",
    r"\bnegative\s+for\s+\w+(?:\s+\w+)?",
];

pub const BLOOD_PRESSURE_PATTERNS: &[&str] = &[r"\bbp\b", r"\b\d{2,3}\s*/\s*\d{2,3}\b", r"blood\s+pressure"];
pub const HEART_RATE_PATTERNS: &[&str] = &[r"\bhr\b", r"\bpulse\b", r"heart\s+rate", r"\bbpm\b"];
pub const TEMPERATURE_PATTERNS: &[&str] = &[r"\btemp", r"\d+(?:\.\d+)?\s*°", r"\b3[4-9]\.\d\b", r"febrile"];
pub const RESPIRATORY_RATE_PATTERNS: &[&str] = &[r"\brr\b", r"resp(?:iratory)?\s+rate", r"breaths?\s*/\s*min"];
pub const WEIGHT_PATTERNS: &[&str] = &[r"\bweight\b", r"\bwt\b", r"\d+(?:\.\d+)?\s*kg\b", r"\bbmi\b"];

/// Keywords that show the reference mentions any lab or imaging work
pub const LAB_PATTERNS: &[&str] = &[
    r"\blabs?\b",
    r"\bbloods?\b",
    r"blood\s+tests?",
    r"\b(?:fbc|cbc|u&e|ues|lfts?|tfts?|crp|esr|hba1c|inr)\b",
    r"\bglucose\b",
    r"\btroponin\b",
    r"\burin(?:e|alysis)\b",
    r"\bculture\b",
    r"\bswab\b",
    r"x-?ray",
    r"\bcxr\b",
    r"\bct\b",
    r"\bmri\b",
    r"ultrasound|\buss\b",
    r"\b(?:ecg|ekg)\b",
    r"\bscan\b",
    r"\bimaging\b",
];

/// Marker of the clinician's impression, captured to end of line
pub const IMPRESSION_PATTERN: &str = r"\bimp(?:ression)?\s*:[ \t]*([^\n]*)";

/// Compiled clinical pattern tables
#[derive(Debug, Clone)]
pub struct ClinicalPatterns {
    negations: Vec<Regex>,
    vitals: Vec<(VitalKind, RegexSet)>,
    labs: RegexSet,
    impression: Regex,
}

fn case_insensitive(pattern: &str) -> String {
    format!("(?i){}", pattern)
}

fn compile_set(patterns: &[&str]) -> Result<RegexSet, regex::Error> {
    RegexSet::new(patterns.iter().map(|p| case_insensitive(p)))
}

impl ClinicalPatterns {
    pub fn new() -> Result<Self, regex::Error> {
        let negations = NEGATION_PATTERNS
            .iter()
            .map(|p| Regex::new(&case_insensitive(p)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut vitals = Vec::with_capacity(VitalKind::all().len());
        for kind in VitalKind::all() {
            vitals.push((kind, compile_set(vital_patterns(kind))?));
        }

        Ok(Self {
            negations,
            vitals,
            labs: compile_set(LAB_PATTERNS)?,
            impression: Regex::new(&case_insensitive(IMPRESSION_PATTERN))?,
        })
    }

    /// Every negation phrase, verbatim, in order of appearance.
    pub fn extract_negations(&self, text: &str) -> Vec<String> {
        let mut found: Vec<(usize, &str)> = self
            .negations
            .iter()
            .flat_map(|re| re.find_iter(text).map(|m| (m.start(), m.as_str())))
            .collect();
        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, s)| s.to_string()).collect()
    }

    /// Does the text mention this kind of vital sign?
    pub fn mentions_vital(&self, text: &str, kind: VitalKind) -> bool {
        self.vitals
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, set)| set.is_match(text))
            .unwrap_or(false)
    }

    pub fn mentions_labs(&self, text: &str) -> bool {
        self.labs.is_match(text)
    }

    /// Text following the first `Imp:` marker, trimmed; `None` when absent or blank.
    pub fn impression<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.impression
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
    }
}

fn vital_patterns(kind: VitalKind) -> &'static [&'static str] {
    match kind {
        VitalKind::BloodPressure => BLOOD_PRESSURE_PATTERNS,
        VitalKind::HeartRate => HEART_RATE_PATTERNS,
        VitalKind::Temperature => TEMPERATURE_PATTERNS,
        VitalKind::RespiratoryRate => RESPIRATORY_RATE_PATTERNS,
        VitalKind::Weight => WEIGHT_PATTERNS,
    }
}

/// Vocabulary entries that occur as substrings of the normalized text, in vocabulary order.
pub fn extract_symptoms<S: AsRef<str>>(text: &str, vocabulary: &[S]) -> Vec<String> {
    let normalized = normalize(text);
    let mut found = Vec::new();
    for keyword in vocabulary {
        let keyword: &str = keyword.as_ref();
        if !keyword.is_empty() && normalized.contains(keyword) {
            found.push(keyword.to_string());
        }
    }
    found
}
