// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full fine-tuning pipeline in order:
//
//   Step 1: Load the corpus                 (Layer 4 - data)
//   Step 2: Load / build vocabularies       (Layer 6 - infra)
//   Step 3: Build fixed-width samples       (Layer 4 - data)
//   Step 4: Prepare checkpoint directory    (Layer 6 - infra)
//   Step 5: Save config                     (Layer 6 - infra)
//   Step 6: Run training loop               (Layer 5 - ml)
//
// The hyperparameters are compile-time constants. TrainConfig
// carries them (plus the paths chosen on the command line) so
// they are written next to the checkpoints they produced.
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{SampleBuilder, SemComDataset},
    loader::CorpusLoader,
};
use crate::domain::traits::CorpusSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    vocab_store::VocabStore,
};
use crate::ml::trainer::{run_training, VocabSizes};

// ─── Hyperparameters ─────────────────────────────────────────────────────────
pub const BATCH_SIZE: usize = 32;
pub const EPOCHS: usize = 100;
pub const LEARNING_RATE: f64 = 1e-4;
pub const EPOCH_START: usize = 1;
pub const MAX_TRIPLES: usize = 16;
pub const LR_MILESTONES: [usize; 3] = [10, 20, 40];
pub const LR_GAMMA: f64 = 0.5;
pub const GRAD_CLIP: f32 = 0.1;
/// SNR is drawn from snr_min..snr_max (upper bound excluded).
pub const SNR_MIN_DB: i32 = -5;
pub const SNR_MAX_DB: i32 = 10;
pub const LOG_EVERY: usize = 100;
pub const CHECKPOINT_EVERY: usize = 10;
pub const NUM_WORKERS: usize = 8;
pub const RELEVANCE_THRESHOLD: f64 = 0.5;

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    // paths
    pub corpus_path:         String,
    pub vocab_dir:           String,
    pub pretrained_dir:      String,
    pub checkpoint_dir:      String,
    pub seed:                u64,

    // optimisation
    pub batch_size:          usize,
    pub epochs:              usize,
    pub epoch_start:         usize,
    pub lr:                  f64,
    pub lr_milestones:       Vec<usize>,
    pub lr_gamma:            f64,
    pub grad_clip:           f32,
    pub num_workers:         usize,

    // channel and knowledge
    pub snr_min_db:          i32,
    pub snr_max_db:          i32,
    pub complex_channel:     bool,
    pub max_triples:         usize,
    pub relevance_threshold: f64,

    // bookkeeping
    pub log_every:           usize,
    pub checkpoint_every:    usize,

    // data / architecture
    pub max_sentence_len:    usize,
    pub max_vocab_size:      usize,
    pub d_model:             usize,
    pub num_heads:           usize,
    pub encoder_layers:      usize,
    pub decoder_layers:      usize,
    pub d_ff:                usize,
    pub channel_dim:         usize,
    pub extractor_layers:    usize,
    pub extractor_d_ff:      usize,
    pub dropout:             f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_path:         "dataset/train.json".to_string(),
            vocab_dir:           "dataset".to_string(),
            pretrained_dir:      "ckpt".to_string(),
            checkpoint_dir:      "ckpt".to_string(),
            seed:                42,

            batch_size:          BATCH_SIZE,
            epochs:              EPOCHS,
            epoch_start:         EPOCH_START,
            lr:                  LEARNING_RATE,
            lr_milestones:       LR_MILESTONES.to_vec(),
            lr_gamma:            LR_GAMMA,
            grad_clip:           GRAD_CLIP,
            num_workers:         NUM_WORKERS,

            snr_min_db:          SNR_MIN_DB,
            snr_max_db:          SNR_MAX_DB,
            complex_channel:     true,
            max_triples:         MAX_TRIPLES,
            relevance_threshold: RELEVANCE_THRESHOLD,

            log_every:           LOG_EVERY,
            checkpoint_every:    CHECKPOINT_EVERY,

            max_sentence_len:    32,
            max_vocab_size:      30_000,
            d_model:             128,
            num_heads:           8,
            encoder_layers:      3,
            decoder_layers:      3,
            d_ff:                1024,
            channel_dim:         16,
            extractor_layers:    3,
            extractor_d_ff:      512,
            dropout:             0.1,
        }
    }
}

impl TrainConfig {
    /// Reject settings the training loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.epochs > 0, "epochs must be positive");
        ensure!(self.max_triples > 0, "max_triples must be positive");
        ensure!(
            self.max_sentence_len >= 3,
            "max_sentence_len must fit [BOS], one token and [EOS] (got {})",
            self.max_sentence_len
        );
        ensure!(
            self.snr_min_db < self.snr_max_db,
            "empty SNR range {}..{}",
            self.snr_min_db,
            self.snr_max_db
        );
        ensure!(
            !self.complex_channel || self.channel_dim % 2 == 0,
            "complex channel needs an even channel_dim (got {})",
            self.channel_dim
        );
        ensure!(
            self.d_model % self.num_heads == 0,
            "d_model {} is not divisible by num_heads {}",
            self.d_model,
            self.num_heads
        );
        ensure!(self.log_every > 0 && self.checkpoint_every > 0, "intervals must be positive");
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline on the given device.
    pub fn execute<B: AutodiffBackend>(&self, device: B::Device) -> Result<()> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load the corpus ──────────────────────────────────────────
        let entries = CorpusLoader::new(&cfg.corpus_path).load_all()?;
        ensure!(
            entries.len() >= cfg.batch_size,
            "corpus has {} entries, fewer than one batch of {}",
            entries.len(),
            cfg.batch_size
        );

        // ── Step 2: Vocabularies ─────────────────────────────────────────────
        // Reused from disk when present so ids match the pretrained weights
        let vocab_store  = VocabStore::new(&cfg.vocab_dir);
        let tokenizer    = vocab_store.load_or_build_tokenizer(&entries, cfg.max_vocab_size)?;
        let triple_vocab = vocab_store.load_or_build_triples(&entries)?;
        ensure!(!triple_vocab.is_empty(), "the corpus carries no knowledge triples");
        let vocab = VocabSizes {
            words:   tokenizer.get_vocab_size(true),
            triples: triple_vocab.len(),
        };
        tracing::info!("Vocabulary: {} words, {} triples", vocab.words, vocab.triples);

        // ── Step 3: Fixed-width samples ──────────────────────────────────────
        let builder = SampleBuilder::new(
            &tokenizer, &triple_vocab, cfg.max_sentence_len, cfg.max_triples,
        );
        let samples = builder.build_all(&entries)?;
        let dataset = SemComDataset::new(samples);
        tracing::info!("Built {} training samples", dataset.sample_count());

        // ── Step 4 + 5: Checkpoint directory and config ──────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.pretrained_dir, &cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Training loop (Layer 5) ──────────────────────────────────
        run_training::<B>(cfg, vocab, dataset, &ckpt_manager, &metrics, device)
    }
}
