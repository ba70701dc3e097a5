// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with `clap`, picks the Burn backend
// and hands a TrainConfig to Layer 2 (application).
//
//   semcom-trainer train [--corpus PATH] [--device auto|cpu] ...
//
// The backend is chosen exactly once, here:
//   auto → Autodiff<Wgpu>    on WgpuDevice::default()
//   cpu  → Autodiff<NdArray> on NdArrayDevice::Cpu
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use burn::backend::{
    ndarray::NdArrayDevice,
    wgpu::WgpuDevice,
    Autodiff, NdArray, Wgpu,
};
use clap::Parser;
use commands::{Commands, DeviceKind, TrainArgs};

use crate::application::train_use_case::TrainUseCase;

#[derive(Parser, Debug)]
#[command(
    name = "semcom-trainer",
    version = "0.1.0",
    about = "Fine-tune a knowledge-augmented semantic communication transformer."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on corpus: {}", args.corpus);

    let use_case = TrainUseCase::new((&args).into());
    match args.device {
        DeviceKind::Auto => {
            use_case.execute::<Autodiff<Wgpu>>(WgpuDevice::default())?
        }
        DeviceKind::Cpu => {
            use_case.execute::<Autodiff<NdArray>>(NdArrayDevice::Cpu)?
        }
    }

    println!("Training complete. Checkpoints saved to '{}'.", args.checkpoint_dir);
    Ok(())
}
