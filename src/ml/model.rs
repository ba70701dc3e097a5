use burn::{
    nn::{
        transformer::{
            TransformerDecoder, TransformerDecoderConfig, TransformerDecoderInput,
            TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput,
        },
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{log_softmax, relu},
};

use crate::ml::knowledge::KnowledgeEmbedding;
use crate::ml::masks::TargetMasks;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    #[config(default = 128)]
    pub d_model:     usize,
    #[config(default = 8)]
    pub num_heads:   usize,
    #[config(default = 3)]
    pub num_layers:  usize,
    #[config(default = 1024)]
    pub d_ff:        usize,
    /// Real-valued symbols per token sent over the channel.
    #[config(default = 16)]
    pub channel_dim: usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

/// The swappable part of the transformer. Its width must match the
/// retained embeddings; depth, heads and feed-forward size are free.
#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub d_model:    usize,
    #[config(default = 8)]
    pub num_heads:  usize,
    #[config(default = 3)]
    pub num_layers: usize,
    #[config(default = 1024)]
    pub d_ff:       usize,
    #[config(default = 0.1)]
    pub dropout:    f64,
}

impl TransformerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SemanticTransformer<B> {
        let encoder = TransformerEncoderConfig::new(
            self.d_model, self.d_ff, self.num_heads, self.num_layers,
        )
        .with_dropout(self.dropout)
        .init(device);
        let channel = ChannelCodec {
            to_channel:   LinearConfig::new(self.d_model, self.channel_dim).init(device),
            from_channel: LinearConfig::new(self.channel_dim, self.d_model).init(device),
        };
        SemanticTransformer {
            source_embedding: self.build_embedding(device),
            encoder,
            channel,
            target_embedding: self.build_embedding(device),
            decoder:          self.decoder_config().init(device),
            generator:        LinearConfig::new(self.d_model, self.vocab_size).init(device),
        }
    }

    /// The decoder shape the pretrained base was trained with.
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::new(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
    }

    fn build_embedding<B: Backend>(&self, device: &B::Device) -> TokenEmbedding<B> {
        TokenEmbedding {
            token:    EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position: EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            dropout:  DropoutConfig::new(self.dropout).init(),
        }
    }
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TextDecoder<B> {
        let layers = TransformerDecoderConfig::new(
            self.d_model, self.d_ff, self.num_heads, self.num_layers,
        )
        .with_dropout(self.dropout)
        .init(device);
        TextDecoder { layers }
    }
}

/// Token plus learned position embedding.
#[derive(Module, Debug)]
pub struct TokenEmbedding<B: Backend> {
    pub token:    Embedding<B>,
    pub position: Embedding<B>,
    pub dropout:  Dropout,
}

impl<B: Backend> TokenEmbedding<B> {
    /// ids: [batch, seq_len] → [batch, seq_len, d_model]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = ids.dims();
        let tok_emb = self.token.forward(ids);

        // Attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position.forward(positions);

        self.dropout.forward(tok_emb + pos_emb)
    }
}

/// Dense maps into and out of the channel symbol space.
#[derive(Module, Debug)]
pub struct ChannelCodec<B: Backend> {
    pub to_channel:   Linear<B>,
    pub from_channel: Linear<B>,
}

#[derive(Module, Debug)]
pub struct TextDecoder<B: Backend> {
    pub layers: TransformerDecoder<B>,
}

impl<B: Backend> TextDecoder<B> {
    pub fn forward(
        &self,
        target:      Tensor<B, 3>,
        masks:       &TargetMasks<B>,
        memory:      Tensor<B, 3>,
        memory_pad:  Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let input = TransformerDecoderInput::new(target, memory)
            .target_mask_pad(masks.pad.clone())
            .target_mask_attn(masks.causal.clone())
            .memory_mask_pad(memory_pad);
        self.layers.forward(input)
    }
}

/// Encoder, channel codec, decoder and output projection of the
/// semantic communication system.
#[derive(Module, Debug)]
pub struct SemanticTransformer<B: Backend> {
    pub source_embedding: TokenEmbedding<B>,
    pub encoder:          TransformerEncoder<B>,
    pub channel:          ChannelCodec<B>,
    pub target_embedding: TokenEmbedding<B>,
    pub decoder:          TextDecoder<B>,
    pub generator:        Linear<B>,
}

/// Everything of a [`SemanticTransformer`] except its decoder.
pub struct RetainedParts<B: Backend> {
    pub source_embedding: TokenEmbedding<B>,
    pub encoder:          TransformerEncoder<B>,
    pub channel:          ChannelCodec<B>,
    pub target_embedding: TokenEmbedding<B>,
    pub generator:        Linear<B>,
}

impl<B: Backend> SemanticTransformer<B> {
    /// Split off the decoder; the remaining parts keep their weights.
    pub fn into_retained(self) -> (RetainedParts<B>, TextDecoder<B>) {
        let Self { source_embedding, encoder, channel, target_embedding, decoder, generator } = self;
        let parts = RetainedParts { source_embedding, encoder, channel, target_embedding, generator };
        (parts, decoder)
    }

    pub fn assemble(parts: RetainedParts<B>, decoder: TextDecoder<B>) -> Self {
        let RetainedParts { source_embedding, encoder, channel, target_embedding, generator } = parts;
        Self { source_embedding, encoder, channel, target_embedding, decoder, generator }
    }

    /// Drop the current decoder and assemble a new model around `decoder`.
    pub fn with_decoder(self, decoder: TextDecoder<B>) -> Self {
        let (parts, _replaced) = self.into_retained();
        Self::assemble(parts, decoder)
    }

    /// src: [batch, seq] → channel symbols [batch, seq, channel_dim]
    pub fn encode(&self, src: Tensor<B, 2, Int>, src_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let x = self.source_embedding.forward(src);
        let x = self.encoder.forward(TransformerEncoderInput::new(x).mask_pad(src_pad));
        self.channel.to_channel.forward(x)
    }

    /// Received symbols back into the model width: [batch, seq, d_model]
    pub fn from_channel_emb(&self, symbols: Tensor<B, 3>) -> Tensor<B, 3> {
        relu(self.channel.from_channel.forward(symbols))
    }

    /// Teacher-forced decoding of `trg` against `memory`.
    pub fn decode(
        &self,
        memory:     Tensor<B, 3>,
        memory_pad: Tensor<B, 2, Bool>,
        trg:        Tensor<B, 2, Int>,
        masks:      &TargetMasks<B>,
    ) -> Tensor<B, 3> {
        let target = self.target_embedding.forward(trg);
        self.decoder.forward(target, masks, memory, memory_pad)
    }

    /// Hidden states → log-probabilities over the vocabulary.
    pub fn generate(&self, hidden: Tensor<B, 3>) -> Tensor<B, 3> {
        log_softmax(self.generator.forward(hidden), 2)
    }
}

/// The trainable parameter set: transformer with its new decoder plus
/// the knowledge embedding. One optimizer owns both.
#[derive(Module, Debug)]
pub struct SemComModel<B: Backend> {
    pub transformer: SemanticTransformer<B>,
    pub knowledge:   KnowledgeEmbedding<B>,
}
