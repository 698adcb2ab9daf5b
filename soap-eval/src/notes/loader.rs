//! Loading reference annotations and batch result files from disk

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{CandidateOutput, ReferenceRecord};
use crate::config::Config;

/// Error type for file loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Reference file not found: {0}")]
    MissingReference(PathBuf),
}

impl LoadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        LoadError::Io { path: path.to_path_buf(), source }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        LoadError::Json { path: path.to_path_buf(), source }
    }
}

/// A batch result file paired with the reference it should be scored against
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFile {
    pub path: PathBuf,
    /// The image-id prefix that matched the file name
    pub image_prefix: String,
    pub reference_path: PathBuf,
}

/// Load a reference annotation file
pub fn load_reference(path: impl AsRef<Path>) -> Result<ReferenceRecord, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::MissingReference(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| LoadError::json(path, e))
}

/// Load one batch result file
pub fn load_candidate(path: impl AsRef<Path>) -> Result<CandidateOutput, LoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| LoadError::json(path, e))
}

/// Scan the results directory for `*.json` files with a configured image prefix.
///
/// Files are returned sorted by name so runs are reproducible. Files whose
/// name matches no configured prefix are logged and left out.
pub fn discover_result_files(config: &Config) -> Result<Vec<ResultFile>, LoadError> {
    let dir = &config.paths.results_dir;
    let entries = std::fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| LoadError::io(dir, e))?.path();
        if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match config.reference_for(&stem) {
            Some((prefix, reference_path)) => files.push(ResultFile {
                path,
                image_prefix: prefix.to_string(),
                reference_path,
            }),
            None => tracing::warn!("No reference mapping for {}", path.display()),
        }
    }

    Ok(files)
}

/// Reference records loaded on first use and kept for the rest of the run
#[derive(Debug, Default)]
pub struct ReferenceCache {
    loaded: HashMap<PathBuf, ReferenceRecord>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, path: &Path) -> Result<&ReferenceRecord, LoadError> {
        if !self.loaded.contains_key(path) {
            let record = load_reference(path)?;
            self.loaded.insert(path.to_path_buf(), record);
        }
        self.loaded
            .get(path)
            .ok_or_else(|| LoadError::MissingReference(path.to_path_buf()))
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "5.json",
            r#"{"day": 2, "consultation": 5, "presenting_complaint": "headache",
                "note": "Imp: Migraine", "highlights": ["headache"]}"#,
        );
        let reference = load_reference(&path).unwrap();
        assert_eq!(reference.consultation, 5);
        assert_eq!(reference.highlights, vec!["headache"]);
    }

    #[test]
    fn test_load_missing_reference() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_reference(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, LoadError::MissingReference(_)));
    }

    #[test]
    fn test_load_malformed_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.json", "{ not json");
        let err = load_candidate(&path).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_discover_result_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "note_02_soap_b.json", "{}");
        write(dir.path(), "note_01_soap_a.json", "{}");
        write(dir.path(), "unmapped.json", "{}");
        write(dir.path(), "note_01_readme.txt", "");

        let mut config = Config::default();
        config.paths.results_dir = dir.path().to_path_buf();
        config.paths.references_dir = PathBuf::from("refs");
        config.references = IndexMap::from([
            ("note_01".to_string(), "1.json".to_string()),
            ("note_02".to_string(), "2.json".to_string()),
        ]);

        let files = discover_result_files(&config).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].path.ends_with("note_01_soap_a.json"));
        assert_eq!(files[0].image_prefix, "note_01");
        assert_eq!(files[1].reference_path, PathBuf::from("refs").join("2.json"));
    }

    #[test]
    fn test_discover_missing_dir() {
        let mut config = Config::default();
        config.paths.results_dir = PathBuf::from("/definitely/not/here");
        assert!(matches!(discover_result_files(&config), Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_reference_cache_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "1.json", r#"{"note": "Cough"}"#);
        let mut cache = ReferenceCache::new();
        assert_eq!(cache.get_or_load(&path).unwrap().note, "Cough");
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cache.get_or_load(&path).unwrap().note, "Cough");
        assert_eq!(cache.len(), 1);
    }
}
