// ============================================================
// Layer 5 — Sequence Views and Attention Masks
// ============================================================
// Masks follow Burn's convention: `true` marks a position the
// attention must NOT look at.
//
// Shift convention for teacher forcing, with
// sentences = [BOS] w1 w2 [EOS] [PAD]:
//
//   src   = sentences[:, 1..]        w1  w2  [EOS] [PAD]
//   trg   = sentences[:, ..S-1]      [BOS] w1  w2  [EOS]
//   trg_y = sentences[:, 1..]        w1  w2  [EOS] [PAD]
//
// Reference: Vaswani et al. (2017) Attention Is All You Need

use burn::{nn::attention::generate_autoregressive_mask, prelude::*};

use crate::domain::tokens::PAD_ID;

/// The three shifted views of a sentence batch.
pub struct Shifted<B: Backend> {
    pub src:   Tensor<B, 2, Int>,
    pub trg:   Tensor<B, 2, Int>,
    pub trg_y: Tensor<B, 2, Int>,
}

pub fn shift<B: Backend>(sentences: Tensor<B, 2, Int>) -> Shifted<B> {
    let [batch_size, seq_len] = sentences.dims();
    let src = sentences.clone().slice([0..batch_size, 1..seq_len]);
    let trg = sentences.slice([0..batch_size, 0..seq_len - 1]);
    Shifted { trg_y: src.clone(), src, trg }
}

/// True at `[PAD]` positions: [batch, seq]
pub fn source_pad_mask<B: Backend>(src: Tensor<B, 2, Int>) -> Tensor<B, 2, Bool> {
    src.equal_elem(PAD_ID as i64)
}

/// True where a triple slot holds the pad sentinel: [batch, max_triples]
pub fn triple_pad_mask<B: Backend>(triples: Tensor<B, 2, Int>, pad_id: u32) -> Tensor<B, 2, Bool> {
    triples.equal_elem(pad_id as i64)
}

/// Target-side masks. Together they hide future positions and padding.
pub struct TargetMasks<B: Backend> {
    /// [batch, seq], true at `[PAD]`
    pub pad:    Tensor<B, 2, Bool>,
    /// [batch, seq, seq], true where key index > query index
    pub causal: Tensor<B, 3, Bool>,
}

pub fn target_masks<B: Backend>(trg: Tensor<B, 2, Int>) -> TargetMasks<B> {
    let [batch_size, seq_len] = trg.dims();
    let causal = generate_autoregressive_mask::<B>(batch_size, seq_len, &trg.device());
    TargetMasks { pad: source_pad_mask(trg), causal }
}
