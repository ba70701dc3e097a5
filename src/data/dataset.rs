use std::sync::Arc;

use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::preprocessor::Preprocessor;
use crate::domain::entry::CorpusEntry;
use crate::domain::tokens::{BOS_ID, EOS_ID, PAD_ID};
use crate::domain::triples::{pad_triples, TripleVocab};

/// One fully tokenised and padded training sample.
/// Sentence format: [BOS] tokens [EOS] [PAD]...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemComSample {
    pub sentence: Vec<u32>,
    /// Ground-truth triple ids, padded to max_triples with the sentinel.
    pub triples:  Vec<u32>,
    /// Real tokens in `sentence`, markers included.
    pub length:   usize,
}

/// Turns corpus entries into fixed-width samples.
pub struct SampleBuilder<'a> {
    tokenizer:        &'a Tokenizer,
    triple_vocab:     &'a TripleVocab,
    preprocessor:     Preprocessor,
    max_sentence_len: usize,
    max_triples:      usize,
}

impl<'a> SampleBuilder<'a> {
    pub fn new(
        tokenizer:        &'a Tokenizer,
        triple_vocab:     &'a TripleVocab,
        max_sentence_len: usize,
        max_triples:      usize,
    ) -> Self {
        Self {
            tokenizer,
            triple_vocab,
            preprocessor: Preprocessor::new(),
            max_sentence_len,
            max_triples,
        }
    }

    pub fn build(&self, entry: &CorpusEntry) -> Result<SemComSample> {
        let text = self.preprocessor.clean(&entry.text);
        let enc  = self
            .tokenizer
            .encode(text.as_str(), false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        // Room for the two markers; EOS always survives truncation.
        let body_len = self.max_sentence_len.saturating_sub(2);
        let mut sentence = Vec::with_capacity(self.max_sentence_len);
        sentence.push(BOS_ID);
        sentence.extend(enc.get_ids().iter().take(body_len));
        sentence.push(EOS_ID);

        let length = sentence.len();
        sentence.resize(self.max_sentence_len, PAD_ID);

        let triples = pad_triples(
            self.triple_vocab.encode(&entry.triples),
            self.max_triples,
            self.triple_vocab.pad_id(),
        );

        Ok(SemComSample { sentence, triples, length })
    }

    pub fn build_all(&self, entries: &[CorpusEntry]) -> Result<Vec<SemComSample>> {
        entries.iter().map(|e| self.build(e)).collect()
    }
}

/// Cheap to clone: every epoch wraps its own shuffled view around
/// the same samples.
#[derive(Clone)]
pub struct SemComDataset {
    samples: Arc<Vec<SemComSample>>,
}

impl SemComDataset {
    pub fn new(samples: Vec<SemComSample>) -> Self { Self { samples: Arc::new(samples) } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<SemComSample> for SemComDataset {
    fn get(&self, index: usize) -> Option<SemComSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Groups consecutive samples of `inner` into full batches. The
/// trailing `len % batch_size` samples are left out, so every item is
/// exactly one training batch no matter how the loader partitions the
/// items between its workers.
pub struct FullBatchDataset<D> {
    inner:      D,
    batch_size: usize,
}

impl<D: Dataset<SemComSample>> FullBatchDataset<D> {
    pub fn new(inner: D, batch_size: usize) -> Self {
        Self { inner, batch_size }
    }

    /// Samples that do not fill a last batch.
    pub fn remainder(&self) -> usize {
        self.inner.len() % self.batch_size
    }
}

impl<D: Dataset<SemComSample>> Dataset<Vec<SemComSample>> for FullBatchDataset<D> {
    fn get(&self, index: usize) -> Option<Vec<SemComSample>> {
        if index >= self.len() {
            return None;
        }
        let start = index * self.batch_size;
        (start..start + self.batch_size).map(|i| self.inner.get(i)).collect()
    }

    fn len(&self) -> usize {
        self.inner.len() / self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::vocab_store::VocabStore;

    fn fixtures() -> (tempfile::TempDir, Tokenizer, TripleVocab, Vec<CorpusEntry>) {
        let entries = vec![
            CorpusEntry::new("Alan Bean was born in Wheeler", vec!["Alan_Bean | birthPlace | Wheeler"]),
            CorpusEntry::new("Wheeler is in Texas", vec!["Wheeler | isPartOf | Texas", "Unknown | x | y"]),
        ];
        let dir   = tempfile::tempdir().unwrap();
        let store = VocabStore::new(dir.path());
        let tok   = store.load_or_build_tokenizer(&entries, 100).unwrap();
        let vocab = TripleVocab::build(&entries[..1]);
        (dir, tok, vocab, entries)
    }

    #[test]
    fn test_sentence_has_markers_and_padding() {
        let (_dir, tok, vocab, entries) = fixtures();
        let builder = SampleBuilder::new(&tok, &vocab, 10, 4);
        let s = builder.build(&entries[0]).unwrap();

        assert_eq!(s.sentence.len(), 10);
        assert_eq!(s.length, 8); // 6 words + BOS + EOS
        assert_eq!(s.sentence[0], BOS_ID);
        assert_eq!(s.sentence[7], EOS_ID);
        assert!(s.sentence[8..].iter().all(|&t| t == PAD_ID));
    }

    #[test]
    fn test_truncation_keeps_eos() {
        let (_dir, tok, vocab, entries) = fixtures();
        let builder = SampleBuilder::new(&tok, &vocab, 4, 4);
        let s = builder.build(&entries[0]).unwrap();

        assert_eq!(s.sentence.len(), 4);
        assert_eq!(s.length, 4);
        assert_eq!(s.sentence[3], EOS_ID);
    }

    #[test]
    fn test_triples_use_pad_sentinel_and_drop_unknown() {
        let (_dir, tok, vocab, entries) = fixtures();
        let builder = SampleBuilder::new(&tok, &vocab, 10, 3);
        let s = builder.build(&entries[1]).unwrap();

        // Neither triple of the second entry is in the vocabulary.
        assert_eq!(s.triples, vec![vocab.pad_id(); 3]);

        let s = builder.build(&entries[0]).unwrap();
        assert_eq!(s.triples, vec![0, vocab.pad_id(), vocab.pad_id()]);
    }

    #[test]
    fn test_dataset_trait() {
        let (_dir, tok, vocab, entries) = fixtures();
        let samples = SampleBuilder::new(&tok, &vocab, 10, 3).build_all(&entries).unwrap();
        let ds = SemComDataset::new(samples);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.sample_count(), 2);
        assert!(ds.get(1).is_some());
        assert!(ds.get(2).is_none());
    }

    fn numbered(n: usize) -> SemComDataset {
        SemComDataset::new(
            (0..n as u32)
                .map(|i| SemComSample { sentence: vec![BOS_ID, i, EOS_ID], triples: vec![0], length: 3 })
                .collect(),
        )
    }

    #[test]
    fn test_full_batches_drop_only_the_remainder() {
        let batches = FullBatchDataset::new(numbered(10), 4);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches.remainder(), 2);

        let second = batches.get(1).unwrap();
        let ids: Vec<u32> = second.iter().map(|s| s.sentence[1]).collect();
        assert_eq!(ids, vec![4, 5, 6, 7]);
        assert!(batches.get(2).is_none());
    }

    #[test]
    fn test_smaller_than_one_batch_is_empty() {
        let batches = FullBatchDataset::new(numbered(3), 4);
        assert_eq!(batches.len(), 0);
        assert_eq!(batches.remainder(), 3);
        assert!(batches.get(0).is_none());
    }
}
