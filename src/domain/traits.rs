// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to the corpus through a trait so
// the JSON loader can be swapped (e.g. for an XML WebNLG
// reader) without touching the training workflow.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::entry::CorpusEntry;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can produce the training corpus.
///
/// Implementations:
///   - CorpusLoader → reads a JSON array of entries from disk
pub trait CorpusSource {
    /// Load every entry from this source.
    fn load_all(&self) -> Result<Vec<CorpusEntry>>;
}
