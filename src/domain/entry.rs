// ============================================================
// Layer 3 — Corpus Entry Domain Type
// ============================================================
// One record of a WebNLG-style corpus: a natural language
// sentence together with the knowledge triples it expresses.
//
// Example:
//   text:    "Alan Bean was born in Wheeler, Texas."
//   triples: ["Alan_Bean | birthPlace | Wheeler,_Texas"]
//
// Triples are kept as opaque strings at this layer. The
// TripleVocab (see triples.rs) maps them to integer ids.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

/// A sentence paired with the knowledge triples it verbalises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// The surface sentence
    pub text: String,

    /// Knowledge triples in "subject | predicate | object" form.
    /// Missing in the JSON means the sentence carries no triples.
    #[serde(default)]
    pub triples: Vec<String>,
}

impl CorpusEntry {
    /// Create a new entry from anything string-like.
    pub fn new<S: Into<String>>(text: impl Into<String>, triples: Vec<S>) -> Self {
        Self {
            text:    text.into(),
            triples: triples.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triples_default_to_empty() {
        let e: CorpusEntry = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(e.text, "hello");
        assert!(e.triples.is_empty());
    }
}
