// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the `train` subcommand and its flags.
//
// Only paths, the seed, the channel model and the device are
// exposed. The optimisation hyperparameters are fixed in
// TrainConfig::default() so every run is comparable.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the knowledge-augmented transformer
    Train(TrainArgs),
}

/// Which Burn backend to train on
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// WGPU on the default adapter
    Auto,
    /// NdArray on the CPU
    Cpu,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON corpus: an array of {"text": ..., "triples": [...]}
    #[arg(long, default_value = "dataset/train.json")]
    pub corpus: String,

    /// Where tokenizer.json and triple_vocab.json live (built if missing)
    #[arg(long, default_value = "dataset")]
    pub vocab_dir: String,

    /// Directory holding the pretrained transformer and extractor records
    #[arg(long, default_value = "ckpt")]
    pub pretrained_dir: String,

    /// Directory for fine-tuned checkpoints, config and metrics
    #[arg(long, default_value = "ckpt")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Use a real-valued channel instead of the complex one
    #[arg(long)]
    pub real_channel: bool,

    #[arg(long, value_enum, default_value_t = DeviceKind::Auto)]
    pub device: DeviceKind,
}

/// The application layer never sees clap types.
impl From<&TrainArgs> for TrainConfig {
    fn from(a: &TrainArgs) -> Self {
        TrainConfig {
            corpus_path:     a.corpus.clone(),
            vocab_dir:       a.vocab_dir.clone(),
            pretrained_dir:  a.pretrained_dir.clone(),
            checkpoint_dir:  a.checkpoint_dir.clone(),
            seed:            a.seed,
            complex_channel: !a.real_channel,
            ..TrainConfig::default()
        }
    }
}
