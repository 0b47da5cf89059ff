//! Reference document loader
//!
//! Walks the raw reference tree (one subfolder per category) and writes the
//! extracted text of every PDF/DOCX to `{category}_{stem}.txt`. The category
//! of each processed file is recorded in a manifest so the corpus builder does
//! not have to recover it from the file name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::FileType;

use super::parser::FileParser;

/// Manifest written next to the processed texts
pub const MANIFEST_FILE: &str = "categories.json";

/// Processed file stem -> category (folder the raw document lived in)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryManifest {
    entries: BTreeMap<String, String>,
}

impl CategoryManifest {
    /// Read the manifest in `processed_dir`; a missing file is an empty manifest
    pub fn load(processed_dir: &Path) -> Result<Self> {
        let path = processed_dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = std::fs::read(&path)?;
        serde_json::from_slice(&raw).map_err(|e| {
            Error::Config(format!("Invalid category manifest {}: {}", path.display(), e))
        })
    }

    /// Write the manifest into `processed_dir`
    pub fn save(&self, processed_dir: &Path) -> Result<()> {
        let path = processed_dir.join(MANIFEST_FILE);
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn insert(&mut self, stem: impl Into<String>, category: impl Into<String>) {
        self.entries.insert(stem.into(), category.into());
    }

    /// Category recorded for a processed file stem
    pub fn category(&self, stem: &str) -> Option<&str> {
        self.entries.get(stem).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of a loader run
#[derive(Debug, Default)]
pub struct LoadSummary {
    /// Processed text files written
    pub written: Vec<PathBuf>,
    /// Source files that were not converted, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

/// Converts raw reference documents into processed text files
pub struct ReferenceLoader {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl ReferenceLoader {
    /// Create a loader between two directories
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    /// Category of a raw reference document: its parent folder name
    pub fn category(path: &Path) -> String {
        path.parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Processed file name for a raw reference document
    pub fn output_name(path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("{}_{}.txt", Self::category(path), stem)
    }

    /// Convert every supported document under the raw directory
    ///
    /// Files are visited in sorted order. Parse failures skip the file; a
    /// document with no extractable text still gets an (empty) processed file
    /// so checklist verification sees it.
    pub fn run(&self) -> Result<LoadSummary> {
        if !self.raw_dir.is_dir() {
            return Err(Error::Config(format!(
                "Reference documents directory not found: {}",
                self.raw_dir.display()
            )));
        }
        std::fs::create_dir_all(&self.processed_dir)?;

        let mut summary = LoadSummary::default();
        let mut manifest = CategoryManifest::load(&self.processed_dir)?;

        for entry in WalkDir::new(&self.raw_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !FileType::from_path(path).is_supported() {
                tracing::info!("Skipping unsupported file: {}", path.display());
                summary
                    .skipped
                    .push((path.to_path_buf(), "unsupported file type".to_string()));
                continue;
            }

            let text = match FileParser::parse_path(path) {
                Ok(parsed) => parsed.content,
                Err(Error::EmptyDocument(name)) => {
                    tracing::warn!("No text extracted from {}", name);
                    String::new()
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", path.display(), e);
                    summary.skipped.push((path.to_path_buf(), e.to_string()));
                    continue;
                }
            };

            let out_name = Self::output_name(path);
            let out_path = self.processed_dir.join(&out_name);
            std::fs::write(&out_path, text)?;
            manifest.insert(out_name.trim_end_matches(".txt"), Self::category(path));
            tracing::info!(
                "Processed {} -> {}",
                path.display(),
                out_path.display()
            );
            summary.written.push(out_path);
        }

        manifest.save(&self.processed_dir)?;

        tracing::info!(
            "Loaded {} reference documents ({} skipped)",
            summary.written.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_docx;

    #[test]
    fn test_output_name_uses_parent_folder() {
        let path = Path::new("data/adgm_reference_docs/templates/Model Articles.docx");
        assert_eq!(ReferenceLoader::output_name(path), "templates_Model Articles.txt");
    }

    #[test]
    fn test_run_converts_nested_documents() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        let processed = dir.path().join("processed");
        std::fs::create_dir_all(raw.join("templates")).unwrap();
        std::fs::create_dir_all(raw.join("checklists").join("nested")).unwrap();

        write_docx(&raw.join("templates").join("Resolution.docx"), &["Resolution of shareholders"]);
        write_docx(
            &raw.join("checklists").join("nested").join("Registration.docx"),
            &["Company set-up checklist"],
        );
        std::fs::write(raw.join("templates").join("readme.md"), "ignore me").unwrap();

        let summary = ReferenceLoader::new(&raw, &processed).run().unwrap();

        assert_eq!(summary.written.len(), 2);
        assert_eq!(summary.skipped.len(), 1);
        let text = std::fs::read_to_string(processed.join("templates_Resolution.txt")).unwrap();
        assert_eq!(text, "Resolution of shareholders");
        assert!(processed.join("nested_Registration.txt").is_file());

        let manifest = CategoryManifest::load(&processed).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.category("templates_Resolution"), Some("templates"));
        assert_eq!(manifest.category("nested_Registration"), Some("nested"));
    }

    #[test]
    fn test_manifest_keeps_underscored_folder_names() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        let processed = dir.path().join("processed");
        std::fs::create_dir_all(raw.join("checklists_docs")).unwrap();
        write_docx(&raw.join("checklists_docs").join("Branch.docx"), &["Branch registration checklist"]);

        ReferenceLoader::new(&raw, &processed).run().unwrap();

        let manifest = CategoryManifest::load(&processed).unwrap();
        assert_eq!(manifest.category("checklists_docs_Branch"), Some("checklists_docs"));
    }

    #[test]
    fn test_manifest_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CategoryManifest::load(dir.path()).unwrap().is_empty());

        std::fs::write(dir.path().join(MANIFEST_FILE), "[1, 2]").unwrap();
        assert!(matches!(CategoryManifest::load(dir.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_corrupt_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        std::fs::create_dir_all(raw.join("policies")).unwrap();
        std::fs::write(raw.join("policies").join("broken.docx"), b"garbage").unwrap();

        let summary = ReferenceLoader::new(&raw, dir.path().join("out")).run().unwrap();
        assert!(summary.written.is_empty());
        assert_eq!(summary.skipped.len(), 1);
    }

    #[test]
    fn test_missing_raw_dir_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ReferenceLoader::new(dir.path().join("missing"), dir.path().join("out")).run();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
