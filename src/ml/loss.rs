use burn::prelude::*;

/// Mean negative log-likelihood over the real positions of `targets`.
///
/// `lengths` counts the tokens of the unshifted sentence, markers
/// included, so row `b` of the shifted targets has `lengths[b] - 1`
/// real positions. Anything past them is filled with zero before the
/// sum and never reaches the gradient.
///
/// log_probs: [batch, seq, vocab], targets: [batch, seq], lengths: [batch]
pub fn masked_cross_entropy<B: Backend>(
    log_probs: Tensor<B, 3>,
    targets:   Tensor<B, 2, Int>,
    lengths:   Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let [batch_size, seq_len, _] = log_probs.dims();
    let device = log_probs.device();

    let picked = log_probs
        .gather(2, targets.reshape([batch_size, seq_len, 1]))
        .reshape([batch_size, seq_len]);

    let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
        .reshape([1, seq_len])
        .expand([batch_size, seq_len]);
    let limits = lengths
        .sub_scalar(1)
        .reshape([batch_size, 1])
        .expand([batch_size, seq_len]);
    let hidden = positions.greater_equal(limits);

    let counted = hidden.clone().bool_not().float().sum();
    picked.mask_fill(hidden, 0.0).sum().neg() / counted
}
