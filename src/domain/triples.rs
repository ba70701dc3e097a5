// ============================================================
// Layer 3 — Knowledge Triples
// ============================================================
// A triple is a knowledge-graph fact the decoder may condition
// on. The model never sees triple strings, only their ids:
//
//   "Alan_Bean | birthPlace | Wheeler,_Texas"  →  17
//
// Ids run from 0 to n_triples - 1. The id n_triples itself is
// the padding sentinel, which is why the knowledge embedding
// table has n_triples + 1 rows.
//
// Every per-sample triple list handed to the model has exactly
// max_triples entries: longer lists are truncated, shorter
// ones are right-padded with the sentinel.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::entry::CorpusEntry;

/// Bidirectional mapping between triple strings and ids.
///
/// Serialised as the sorted list of triples; the id of a triple
/// is its position in that list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TripleVocab {
    triples: Vec<String>,
    index:   HashMap<String, u32>,
}

impl TripleVocab {
    /// Collect every distinct triple of the corpus in sorted order,
    /// so two builds over the same corpus assign the same ids.
    pub fn build(entries: &[CorpusEntry]) -> Self {
        let unique: BTreeSet<&str> = entries
            .iter()
            .flat_map(|e| e.triples.iter().map(String::as_str))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        Self::from(unique.into_iter().map(str::to_string).collect::<Vec<_>>())
    }

    /// Number of real triples.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// The padding sentinel, one past the last real id.
    pub fn pad_id(&self) -> u32 {
        self.triples.len() as u32
    }

    pub fn id_of(&self, triple: &str) -> Option<u32> {
        self.index.get(triple.trim()).copied()
    }

    /// Map triple strings to ids, dropping the ones this vocabulary
    /// has never seen.
    pub fn encode(&self, triples: &[String]) -> Vec<u32> {
        triples.iter().filter_map(|t| self.id_of(t)).collect()
    }
}

impl From<Vec<String>> for TripleVocab {
    fn from(triples: Vec<String>) -> Self {
        let index = triples
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();
        Self { triples, index }
    }
}

impl From<TripleVocab> for Vec<String> {
    fn from(vocab: TripleVocab) -> Self {
        vocab.triples
    }
}

/// Truncate or right-pad `ids` to exactly `max_triples` entries.
pub fn pad_triples(mut ids: Vec<u32>, max_triples: usize, pad_id: u32) -> Vec<u32> {
    ids.truncate(max_triples);
    ids.resize(max_triples, pad_id);
    ids
}

/// Turn one row of the thresholded extractor output into a
/// fixed-width id list: ids of the relevant triples in ascending
/// order, then padding.
pub fn select_triples(relevant: &[bool], max_triples: usize, pad_id: u32) -> Vec<u32> {
    let ids = relevant
        .iter()
        .enumerate()
        .filter(|(_, hit)| **hit)
        .map(|(id, _)| id as u32)
        .collect();
    pad_triples(ids, max_triples, pad_id)
}

/// How many of the ground-truth triples (padding excluded) appear in
/// `selected`. Returns `(hits, total)`.
pub fn triple_hits(selected: &[u32], truth: &[u32], pad_id: u32) -> (usize, usize) {
    let truth: BTreeSet<u32> = truth.iter().copied().filter(|&t| t != pad_id).collect();
    let picked: BTreeSet<u32> = selected.iter().copied().filter(|&t| t != pad_id).collect();
    let hits = picked.intersection(&truth).count();
    (hits, truth.len())
}
