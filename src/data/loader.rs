// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Loads a WebNLG-style corpus stored as one JSON array:
//
//   [
//     { "text": "Alan Bean was born in Wheeler, Texas.",
//       "triples": ["Alan_Bean | birthPlace | Wheeler,_Texas"] },
//     ...
//   ]
//
// Unlike a document folder, a missing corpus is fatal: the
// trainer has nothing to learn from and the pretrained parts
// were built against this exact data.
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::entry::CorpusEntry;
use crate::domain::traits::CorpusSource;

/// Loads corpus entries from a JSON file.
/// Implements the CorpusSource trait from Layer 3.
pub struct CorpusLoader {
    path: PathBuf,
}

impl CorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusSource for CorpusLoader {
    fn load_all(&self) -> Result<Vec<CorpusEntry>> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))?;

        let entries: Vec<CorpusEntry> = serde_json::from_str(&json)
            .with_context(|| format!("Malformed corpus JSON in '{}'", self.path.display()))?;

        let skipped = entries.iter().filter(|e| e.text.trim().is_empty()).count();
        if skipped > 0 {
            tracing::warn!("Skipping {} entries with empty text", skipped);
        }

        let entries: Vec<CorpusEntry> = entries
            .into_iter()
            .filter(|e| !e.text.trim().is_empty())
            .collect();

        tracing::info!(
            "Loaded {} corpus entries from '{}'",
            entries.len(),
            self.path.display()
        );
        Ok(entries)
    }
}
