// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Loads the pretrained parts and writes the fine-tuned ones,
// all through one full-precision named MessagePack recorder.
//
// Read once at startup (from the pretrained directory):
//   transformer_base.mpk.gz       ← encoder, channel codec,
//                                   embeddings, old decoder,
//                                   generator
//   knowledge_extractor.mpk.gz    ← frozen triple predictor
//
// Written every few epochs (into the checkpoint directory,
// overwriting the previous snapshot):
//   semcom_full.mpk.gz            ← transformer with the new
//                                   decoder
//   knowledge_embedding.mpk.gz    ← trained triple embedding
//   train_config.json             ← written before training
//
// NamedMpkGzFileRecorder<FullPrecisionSettings>:
//   - Serialises module records to MessagePack, gzip-compressed
//   - Keeps every parameter as f32, so a reloaded snapshot is
//     bit-identical to the model that was saved
//   - Type-safe: loading fails if the record does not match
//     the module structure it is loaded into
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde_json;

use crate::application::train_use_case::TrainConfig;
use crate::ml::knowledge::KnowledgeExtractor;
use crate::ml::model::{SemComModel, SemanticTransformer};

pub const BASE_TRANSFORMER: &str = "transformer_base";
pub const KNOWLEDGE_EXTRACTOR: &str = "knowledge_extractor";
pub const FULL_TRANSFORMER: &str = "semcom_full";
pub const KNOWLEDGE_EMBEDDING: &str = "knowledge_embedding";

/// Recorder for every record this crate reads or writes.
pub type ModelRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

pub struct CheckpointManager {
    /// Where the pretrained records are read from
    pretrained_dir: PathBuf,
    /// Where fine-tuned records are written to
    dir:            PathBuf,
}

impl CheckpointManager {
    /// Creates the output directory if it doesn't already exist.
    pub fn new(pretrained_dir: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { pretrained_dir: pretrained_dir.into(), dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Restore the pretrained transformer into a freshly built template.
    pub fn load_base<B: Backend>(
        &self,
        template: SemanticTransformer<B>,
        device:   &B::Device,
    ) -> Result<SemanticTransformer<B>> {
        let path = self.pretrained_dir.join(BASE_TRANSFORMER);
        let record = ModelRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load pretrained transformer '{}'", path.display())
            })?;
        tracing::info!("Loaded pretrained transformer from '{}'", path.display());
        Ok(template.load_record(record))
    }

    /// Restore the pretrained knowledge extractor.
    pub fn load_extractor<B: Backend>(
        &self,
        template: KnowledgeExtractor<B>,
        device:   &B::Device,
    ) -> Result<KnowledgeExtractor<B>> {
        let path = self.pretrained_dir.join(KNOWLEDGE_EXTRACTOR);
        let record = ModelRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load knowledge extractor '{}'", path.display())
            })?;
        tracing::info!("Loaded knowledge extractor from '{}'", path.display());
        Ok(template.load_record(record))
    }

    /// Write the trainable parameter set as two records, replacing
    /// whatever snapshot was there before.
    pub fn save_trained<B: Backend>(&self, model: &SemComModel<B>) -> Result<()> {
        let path = self.dir.join(FULL_TRANSFORMER);
        ModelRecorder::new()
            .record(model.transformer.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let path = self.dir.join(KNOWLEDGE_EMBEDDING);
        ModelRecorder::new()
            .record(model.knowledge.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved trained records to '{}'", self.dir.display());
        Ok(())
    }

    /// Path of a written record, with the recorder's extension.
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.mpk.gz"))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| {
                format!("Cannot write config to '{}'", path.display())
            })?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

// Writers for the pretrained records; the real ones come from the
// pretraining runs, tests produce their own.
#[cfg(test)]
impl CheckpointManager {
    pub fn save_pretrained_base<B: Backend>(&self, model: &SemanticTransformer<B>) -> Result<()> {
        fs::create_dir_all(&self.pretrained_dir)?;
        ModelRecorder::new()
            .record(model.clone().into_record(), self.pretrained_dir.join(BASE_TRANSFORMER))?;
        Ok(())
    }

    pub fn save_pretrained_extractor<B: Backend>(&self, model: &KnowledgeExtractor<B>) -> Result<()> {
        fs::create_dir_all(&self.pretrained_dir)?;
        ModelRecorder::new()
            .record(model.clone().into_record(), self.pretrained_dir.join(KNOWLEDGE_EXTRACTOR))?;
        Ok(())
    }
}
