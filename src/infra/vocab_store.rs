// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the two vocabularies the pretrained checkpoints
// were built against:
//
//   vocab_dir/
//     tokenizer.json     ← word-level HuggingFace tokenizer
//     triple_vocab.json  ← sorted list of triple strings
//
// Both are loaded when present and only built from the corpus
// when missing. Rebuilding them would silently reshuffle ids
// and break the pretrained embedding tables.
//
// The tokenizer JSON is written by hand and loaded back with
// Tokenizer::from_file, which avoids the trainer/ModelWrapper
// type mismatch of tokenizers 0.15.
//
// Reference: Sennrich et al. (2016) BPE paper

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::domain::entry::CorpusEntry;
use crate::domain::tokens::{
    BOS_ID, BOS_TOKEN, EOS_ID, EOS_TOKEN, NUM_SPECIAL, PAD_ID, PAD_TOKEN, UNK_ID, UNK_TOKEN,
};
use crate::domain::triples::TripleVocab;

const TOKENIZER_FILE: &str = "tokenizer.json";
const TRIPLE_VOCAB_FILE: &str = "triple_vocab.json";

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load existing tokenizer or build a new one from the corpus
    pub fn load_or_build_tokenizer(
        &self,
        entries:    &[CorpusEntry],
        vocab_size: usize,
    ) -> Result<Tokenizer> {
        let tok_path = self.dir.join(TOKENIZER_FILE);
        if tok_path.exists() {
            tracing::info!("Loading existing tokenizer from '{}'", tok_path.display());
            self.load_tokenizer()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save_tokenizer(entries, vocab_size)
        }
    }

    pub fn load_tokenizer(&self) -> Result<Tokenizer> {
        let path = self.dir.join(TOKENIZER_FILE);
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}", path.display(), e
            ))
    }

    /// Load the triple vocabulary or build it from the corpus.
    pub fn load_or_build_triples(&self, entries: &[CorpusEntry]) -> Result<TripleVocab> {
        let path = self.dir.join(TRIPLE_VOCAB_FILE);
        if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Cannot read '{}'", path.display()))?;
            let vocab: TripleVocab = serde_json::from_str(&json)
                .with_context(|| format!("Malformed triple vocabulary '{}'", path.display()))?;
            tracing::info!("Loaded {} triples from '{}'", vocab.len(), path.display());
            return Ok(vocab);
        }

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let vocab = TripleVocab::build(entries);
        std::fs::write(&path, serde_json::to_string_pretty(&vocab)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::info!("Built triple vocabulary with {} triples", vocab.len());
        Ok(vocab)
    }

    fn build_and_save_tokenizer(
        &self,
        entries:    &[CorpusEntry],
        vocab_size: usize,
    ) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: Word frequencies ──────────────────────────────────────────
        // Split the way the Whitespace pre-tokenizer does (\w+|[^\w\s]+)
        // so every word we count is one the tokenizer can produce.
        let mut freq: HashMap<String, usize> = HashMap::new();
        for entry in entries {
            for word in pre_tokenize(&entry.text.to_lowercase()) {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        // Most frequent first; ties broken alphabetically for stable ids
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(NUM_SPECIAL as usize));

        // ── Step 2: Vocab JSON ────────────────────────────────────────────────
        let mut vocab = serde_json::json!({
            PAD_TOKEN: PAD_ID,
            UNK_TOKEN: UNK_ID,
            BOS_TOKEN: BOS_ID,
            EOS_TOKEN: EOS_ID,
        });

        let mut next_id = NUM_SPECIAL as usize;
        for (word, _) in &words {
            if vocab.get(word).is_none() {
                vocab[word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        // ── Step 3: Tokenizer JSON in HuggingFace format ──────────────────────
        let special = |id: u32, content: &str| serde_json::json!({
            "id": id, "content": content, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        });
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                special(PAD_ID, PAD_TOKEN),
                special(UNK_ID, UNK_TOKEN),
                special(BOS_ID, BOS_TOKEN),
                special(EOS_ID, EOS_TOKEN),
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let tok_path = self.dir.join(TOKENIZER_FILE);
        std::fs::write(&tok_path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| "Cannot write tokenizer JSON")?;

        tracing::info!(
            "Tokenizer built with {} entries, saved to '{}'",
            next_id,
            tok_path.display()
        );

        Tokenizer::from_file(&tok_path)
            .map_err(|e| anyhow::anyhow!("Cannot reload tokenizer: {e}"))
    }
}

/// Split into runs of word characters and runs of punctuation.
fn pre_tokenize(text: &str) -> Vec<String> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_is_word = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() && is_word(c) != current_is_word {
            out.push(std::mem::take(&mut current));
        }
        current_is_word = is_word(c);
        current.push(c);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
