// ============================================================
// Layer 4 — SemCom Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<SemComSample>
// into device tensors.
//
//   Input:  N samples, each with a sentence of length S and
//           exactly max_triples triple ids
//   Output: SemComBatch with
//             sentences [N, S]            Int
//             triples   [N, max_triples]  Int
//             lengths   [N]               Int
//
// Samples are padded upstream by SampleBuilder, so batching is
// a flatten-and-reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::SemComSample;

/// A batch of sentences, their ground-truth triples and true lengths.
#[derive(Debug, Clone)]
pub struct SemComBatch<B: Backend> {
    /// Token ids with markers and padding — shape: [batch_size, seq_len]
    pub sentences: Tensor<B, 2, Int>,

    /// Ground-truth triple ids — shape: [batch_size, max_triples]
    pub triples: Tensor<B, 2, Int>,

    /// Real token count per row — shape: [batch_size]
    pub lengths: Tensor<B, 1, Int>,
}

impl<B: Backend> SemComBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.sentences.dims()[0]
    }
}

/// Holds the target device so tensors are created on the
/// correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct SemComBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SemComBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SemComSample, SemComBatch<B>> for SemComBatcher<B> {
    fn batch(&self, items: Vec<SemComSample>) -> SemComBatch<B> {
        let batch_size  = items.len();
        let seq_len     = items[0].sentence.len();
        let max_triples = items[0].triples.len();

        let sentence_flat: Vec<i64> = items
            .iter()
            .flat_map(|s| s.sentence.iter().map(|&t| t as i64))
            .collect();

        let triple_flat: Vec<i64> = items
            .iter()
            .flat_map(|s| s.triples.iter().map(|&t| t as i64))
            .collect();

        let lengths: Vec<i64> = items.iter().map(|s| s.length as i64).collect();

        let sentences = Tensor::<B, 2, Int>::from_data(
            TensorData::new(sentence_flat, [batch_size, seq_len]),
            &self.device,
        );

        let triples = Tensor::<B, 2, Int>::from_data(
            TensorData::new(triple_flat, [batch_size, max_triples]),
            &self.device,
        );

        let lengths = Tensor::<B, 1, Int>::from_data(
            TensorData::new(lengths, [batch_size]),
            &self.device,
        );

        SemComBatch { sentences, triples, lengths }
    }
}

/// Batches items that are already full batches (see
/// `FullBatchDataset`). Used with a loader batch size of one, each
/// loader batch is one training batch.
#[derive(Clone, Debug)]
pub struct PrebatchedBatcher<B: Backend> {
    inner: SemComBatcher<B>,
}

impl<B: Backend> PrebatchedBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { inner: SemComBatcher::new(device) }
    }
}

impl<B: Backend> Batcher<Vec<SemComSample>, SemComBatch<B>> for PrebatchedBatcher<B> {
    fn batch(&self, items: Vec<Vec<SemComSample>>) -> SemComBatch<B> {
        self.inner.batch(items.into_iter().flatten().collect())
    }
}
