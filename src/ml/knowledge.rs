use burn::{
    nn::{
        transformer::{TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput},
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::sigmoid,
};

/// Predicts which triples a (noisy) sentence encoding talks about.
#[derive(Config, Debug)]
pub struct KnowledgeExtractorConfig {
    pub d_model:    usize,
    pub n_triples:  usize,
    #[config(default = 8)]
    pub num_heads:  usize,
    #[config(default = 3)]
    pub num_layers: usize,
    #[config(default = 512)]
    pub d_ff:       usize,
    #[config(default = 0.1)]
    pub dropout:    f64,
}

impl KnowledgeExtractorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> KnowledgeExtractor<B> {
        KnowledgeExtractor {
            encoder: TransformerEncoderConfig::new(
                self.d_model, self.d_ff, self.num_heads, self.num_layers,
            )
            .with_dropout(self.dropout)
            .init(device),
            head: LinearConfig::new(self.d_model, self.n_triples).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct KnowledgeExtractor<B: Backend> {
    pub encoder: TransformerEncoder<B>,
    pub head:    Linear<B>,
}

impl<B: Backend> KnowledgeExtractor<B> {
    /// memory: [batch, seq, d_model] → relevance in (0, 1): [batch, n_triples]
    pub fn forward(&self, memory: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, _, d_model] = memory.dims();
        let x = self.encoder.forward(TransformerEncoderInput::new(memory));
        let pooled = x.mean_dim(1).reshape([batch_size, d_model]);
        sigmoid(self.head.forward(pooled))
    }
}

/// Trainable lookup from triple ids (pad sentinel included) into the
/// decoder memory space.
#[derive(Config, Debug)]
pub struct KnowledgeEmbeddingConfig {
    /// Real triples plus one row for the pad sentinel.
    pub n_embd:     usize,
    #[config(default = 128)]
    pub embd_dim:   usize,
    #[config(default = 128)]
    pub output_dim: usize,
}

impl KnowledgeEmbeddingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> KnowledgeEmbedding<B> {
        KnowledgeEmbedding {
            embedding:  EmbeddingConfig::new(self.n_embd, self.embd_dim).init(device),
            projection: LinearConfig::new(self.embd_dim, self.output_dim).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct KnowledgeEmbedding<B: Backend> {
    pub embedding:  Embedding<B>,
    pub projection: Linear<B>,
}

impl<B: Backend> KnowledgeEmbedding<B> {
    /// ids: [batch, max_triples] → [batch, max_triples, output_dim]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.projection.forward(self.embedding.forward(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_extractor_outputs_probabilities() {
        let device = Default::default();
        let extractor: KnowledgeExtractor<TestBackend> = KnowledgeExtractorConfig::new(8, 5)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(16)
            .init(&device);

        let memory = Tensor::<TestBackend, 3>::random(
            [3, 6, 8],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let probs = extractor.forward(memory);
        assert_eq!(probs.dims(), [3, 5]);

        let values: Vec<f32> = probs.into_data().convert::<f32>().to_vec().unwrap();
        assert!(values.iter().all(|&p| p > 0.0 && p < 1.0));
    }

    #[test]
    fn test_embedding_accepts_pad_sentinel() {
        let device = Default::default();
        let n_triples = 5;
        let emb: KnowledgeEmbedding<TestBackend> = KnowledgeEmbeddingConfig::new(n_triples + 1)
            .with_embd_dim(4)
            .with_output_dim(8)
            .init(&device);

        let ids = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![0i64, 4, 5, 5], [2, 2]),
            &device,
        );
        assert_eq!(emb.forward(ids).dims(), [2, 2, 8]);
    }
}
