// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fine-tunes the pretrained transformer with a fresh decoder
// and a fresh knowledge embedding, conditioning the decoder on
// triples picked by a frozen extractor.
//
// Per batch:
//
//   sentences ─► src ─► encode ─► channel(snr) ─► from_channel_emb
//                                                   │ (detached)
//                            ┌──────────────────────┤
//                            ▼                      │
//              extractor (inner backend, frozen)    │
//                            │ > 0.5                │
//                            ▼                      ▼
//               triple ids ─► knowledge emb ─► cat(memory, k)
//                                                   │
//   trg ─► decode(memory, mask) ─► generate ─► masked CE vs trg_y
//
// Only the decoder side, the generator and the knowledge
// embedding receive gradients: the memory is detached before
// it leaves the frozen stage, and the extractor lives on the
// inner backend where no graph is recorded at all.
//
// Key Burn insight:
//   - Training uses Autodiff<Inner> for gradients
//   - tensor.inner() hands a tensor to the non-autodiff backend
//   - Gradient clipping is part of the optimizer config and
//     runs inside optim.step()
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::{ops::Range, sync::Arc};

use anyhow::{ensure, Result};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::{transform::ShuffledDataset, Dataset},
    },
    grad_clipping::GradientClippingConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{PrebatchedBatcher, SemComBatch},
    dataset::{FullBatchDataset, SemComDataset},
};
use crate::domain::triples::{select_triples, triple_hits};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::channel::AwgnChannel;
use crate::ml::knowledge::{
    KnowledgeEmbeddingConfig, KnowledgeExtractor, KnowledgeExtractorConfig,
};
use crate::ml::loss::masked_cross_entropy;
use crate::ml::masks::{shift, source_pad_mask, target_masks, triple_pad_mask, Shifted};
use crate::ml::model::{DecoderConfig, SemComModel, TransformerConfig};
use crate::ml::schedule::MultiStepLr;

/// Sizes of the two vocabularies the pretrained records were built for.
#[derive(Debug, Clone, Copy)]
pub struct VocabSizes {
    pub words:   usize,
    pub triples: usize,
}

/// The per-step knobs the trainer needs from TrainConfig.
#[derive(Debug, Clone)]
pub struct TrainerSettings {
    pub batch_size:       usize,
    pub snr_range:        Range<i32>,
    pub max_triples:      usize,
    /// Pad sentinel, equal to the number of triples.
    pub triple_pad:       u32,
    pub threshold:        f64,
    pub log_every:        usize,
    pub checkpoint_every: usize,
    pub seed:             u64,
}

impl TrainerSettings {
    pub fn new(cfg: &TrainConfig, vocab: VocabSizes) -> Self {
        Self {
            batch_size:       cfg.batch_size,
            snr_range:        cfg.snr_min_db..cfg.snr_max_db,
            max_triples:      cfg.max_triples,
            triple_pad:       vocab.triples as u32,
            threshold:        cfg.relevance_threshold,
            log_every:        cfg.log_every,
            checkpoint_every: cfg.checkpoint_every,
            seed:             cfg.seed,
        }
    }
}

/// Output of the frozen stage.
struct Knowledge<B: Backend> {
    /// Noisy, projected encoder output: [batch, seq, d_model]
    memory:  Tensor<B, 3>,
    /// Exactly max_triples ids per sample
    triples: Vec<Vec<u32>>,
    snr_db:  i32,
}

/// Loss and bookkeeping of one forward pass.
pub struct StepForward<B: Backend> {
    pub loss:           Tensor<B, 1>,
    pub snr_db:         i32,
    pub selected:       Vec<Vec<u32>>,
    /// Sequence length of the decoder memory (text + knowledge)
    pub memory_len:     usize,
    pub memory_pad_len: usize,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub loss:     f64,
    pub snr_db:   i32,
    pub selected: Vec<Vec<u32>>,
}

pub fn should_checkpoint(epoch: usize, every: usize) -> bool {
    epoch % every == 0
}

pub struct Trainer<B: AutodiffBackend, O> {
    model:     SemComModel<B>,
    extractor: KnowledgeExtractor<B::InnerBackend>,
    optim:     O,
    scheduler: MultiStepLr,
    channel:   AwgnChannel,
    rng:       StdRng,
    settings:  TrainerSettings,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<SemComModel<B>, B>,
{
    pub fn new(
        model:     SemComModel<B>,
        extractor: KnowledgeExtractor<B::InnerBackend>,
        optim:     O,
        scheduler: MultiStepLr,
        channel:   AwgnChannel,
        settings:  TrainerSettings,
    ) -> Self {
        let rng = StdRng::seed_from_u64(settings.seed);
        Self { model, extractor, optim, scheduler, channel, rng, settings }
    }

    pub fn model(&self) -> &SemComModel<B> {
        &self.model
    }

    pub fn extractor(&self) -> &KnowledgeExtractor<B::InnerBackend> {
        &self.extractor
    }

    pub fn learning_rate(&self) -> f64 {
        self.scheduler.current()
    }

    /// One SNR for the whole batch, uniform over the configured range.
    pub fn sample_snr(&mut self) -> i32 {
        self.rng.gen_range(self.settings.snr_range.clone())
    }

    /// Encode, corrupt, project, and let the frozen extractor pick
    /// triples. Nothing computed here receives a gradient.
    fn extract_knowledge(
        &mut self,
        src:     Tensor<B, 2, Int>,
        src_pad: Tensor<B, 2, Bool>,
    ) -> Result<Knowledge<B>> {
        let snr_db = self.sample_snr();

        let transformer = &self.model.transformer;
        let symbols  = transformer.encode(src, src_pad);
        let received = self.channel.transmit(symbols, snr_db);
        let memory   = transformer.from_channel_emb(received).detach();

        let relevance = self.extractor.forward(memory.clone().inner());
        let [_, n_triples] = relevance.dims();
        let relevant: Vec<i64> = relevance
            .greater_elem(self.settings.threshold)
            .int()
            .into_data()
            .convert::<i64>()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read extractor output: {e:?}"))?;

        let triples = relevant
            .chunks(n_triples)
            .map(|row| {
                let hits: Vec<bool> = row.iter().map(|&v| v != 0).collect();
                select_triples(&hits, self.settings.max_triples, self.settings.triple_pad)
            })
            .collect();

        Ok(Knowledge { memory, triples, snr_db })
    }

    pub fn forward(&mut self, batch: &SemComBatch<B>) -> Result<StepForward<B>> {
        let device     = batch.sentences.device();
        let batch_size = batch.batch_size();

        let Shifted { src, trg, trg_y } = shift(batch.sentences.clone());
        let src_pad = source_pad_mask(src.clone());
        let tgt     = target_masks(trg.clone());

        let knowledge = self.extract_knowledge(src, src_pad.clone())?;

        let flat: Vec<i64> = knowledge.triples.iter().flatten().map(|&t| t as i64).collect();
        let triple_ids = Tensor::<B, 2, Int>::from_data(
            TensorData::new(flat, [batch_size, self.settings.max_triples]),
            &device,
        );

        let k     = self.model.knowledge.forward(triple_ids.clone());
        let k_pad = triple_pad_mask(triple_ids, self.settings.triple_pad);

        // Text positions first, knowledge positions after them.
        let memory     = Tensor::cat(vec![knowledge.memory, k], 1);
        let memory_pad = Tensor::cat(vec![src_pad, k_pad], 1);
        let memory_len     = memory.dims()[1];
        let memory_pad_len = memory_pad.dims()[1];

        let hidden    = self.model.transformer.decode(memory, memory_pad, trg, &tgt);
        let log_probs = self.model.transformer.generate(hidden);
        let loss      = masked_cross_entropy(log_probs, trg_y, batch.lengths.clone());

        Ok(StepForward {
            loss,
            snr_db: knowledge.snr_db,
            selected: knowledge.triples,
            memory_len,
            memory_pad_len,
        })
    }

    /// Forward, backward, clip and step at the current learning rate.
    pub fn train_step(&mut self, batch: &SemComBatch<B>) -> Result<StepReport> {
        let step = self.forward(batch)?;
        let loss: f64 = step.loss.clone().into_scalar().elem::<f64>();

        let grads = step.loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.scheduler.current(), self.model.clone(), grads);

        Ok(StepReport { loss, snr_db: step.snr_db, selected: step.selected })
    }

    /// Run every full batch of one epoch. Partial batches are skipped
    /// so the batch size stays constant.
    pub fn train_epoch<I>(&mut self, epoch: usize, batches: I) -> Result<EpochMetrics>
    where
        I: IntoIterator<Item = SemComBatch<B>>,
    {
        println!("--------------------epoch: {}", epoch);

        let lr = self.learning_rate();
        let mut loss_sum = 0.0f64;
        let mut steps    = 0usize;
        let mut hits     = 0usize;
        let mut truths   = 0usize;
        let mut skipped  = 0usize;

        for (batch_idx, batch) in batches.into_iter().enumerate() {
            if batch.batch_size() != self.settings.batch_size {
                tracing::info!(
                    "Skipping batch of {} samples (expected {})",
                    batch.batch_size(),
                    self.settings.batch_size,
                );
                skipped += 1;
                continue;
            }

            let truth: Vec<i64> = batch
                .triples
                .clone()
                .into_data()
                .convert::<i64>()
                .to_vec()
                .map_err(|e| anyhow::anyhow!("Cannot read triple batch: {e:?}"))?;

            let report = self.train_step(&batch)?;

            for (selected, row) in report.selected.iter().zip(truth.chunks(self.settings.max_triples)) {
                let row: Vec<u32> = row.iter().map(|&t| t as u32).collect();
                let (h, t) = triple_hits(selected, &row, self.settings.triple_pad);
                hits   += h;
                truths += t;
            }

            loss_sum += report.loss;
            steps    += 1;

            if batch_idx % self.settings.log_every == 0 {
                println!("[{:4} / {:4}]    loss = {}", batch_idx, epoch, report.loss);
                tracing::debug!("snr={} dB", report.snr_db);
            }
        }

        Ok(EpochMetrics {
            epoch,
            mean_loss:     if steps > 0 { loss_sum / steps as f64 } else { f64::NAN },
            lr,
            batches:       steps,
            skipped,
            triple_recall: if truths > 0 { hits as f64 / truths as f64 } else { f64::NAN },
        })
    }

    /// Snapshot on checkpoint epochs, then advance the schedule.
    /// Returns whether records were written.
    pub fn finish_epoch(&mut self, epoch: usize, ckpt: &CheckpointManager) -> Result<bool> {
        let save = should_checkpoint(epoch, self.settings.checkpoint_every);
        if save {
            ckpt.save_trained(&self.model)?;
        }
        let next_lr = self.scheduler.step();
        tracing::debug!(
            "Learning rate after {} epochs: {}",
            self.scheduler.epochs_completed(),
            next_lr,
        );
        Ok(save)
    }
}

fn transformer_config(cfg: &TrainConfig, vocab: VocabSizes) -> TransformerConfig {
    TransformerConfig::new(vocab.words, cfg.max_sentence_len)
        .with_d_model(cfg.d_model)
        .with_num_heads(cfg.num_heads)
        .with_num_layers(cfg.encoder_layers)
        .with_d_ff(cfg.d_ff)
        .with_channel_dim(cfg.channel_dim)
        .with_dropout(cfg.dropout)
}

fn decoder_config(cfg: &TrainConfig) -> DecoderConfig {
    DecoderConfig::new(cfg.d_model)
        .with_num_heads(cfg.num_heads)
        .with_num_layers(cfg.decoder_layers)
        .with_d_ff(cfg.d_ff)
        .with_dropout(cfg.dropout)
}

fn extractor_config(cfg: &TrainConfig, vocab: VocabSizes) -> KnowledgeExtractorConfig {
    KnowledgeExtractorConfig::new(cfg.d_model, vocab.triples)
        .with_num_heads(cfg.num_heads)
        .with_num_layers(cfg.extractor_layers)
        .with_d_ff(cfg.extractor_d_ff)
        .with_dropout(cfg.dropout)
}

fn knowledge_config(cfg: &TrainConfig, vocab: VocabSizes) -> KnowledgeEmbeddingConfig {
    KnowledgeEmbeddingConfig::new(vocab.triples + 1)
        .with_embd_dim(cfg.d_model)
        .with_output_dim(cfg.d_model)
}

/// Load the pretrained parts, splice in a new decoder and set up the
/// optimizer over the combined trainable parameters.
pub fn build_trainer<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    vocab:  VocabSizes,
    ckpt:   &CheckpointManager,
    device: &B::Device,
) -> Result<Trainer<B, impl Optimizer<SemComModel<B>, B>>> {
    ensure!(vocab.triples > 0, "the triple vocabulary is empty");

    let base = ckpt.load_base(transformer_config(cfg, vocab).init::<B>(device), device)?;
    let transformer = base.with_decoder(decoder_config(cfg).init(device));

    let extractor = ckpt.load_extractor(
        extractor_config(cfg, vocab).init::<B::InnerBackend>(device),
        device,
    )?;

    let model = SemComModel {
        transformer,
        knowledge: knowledge_config(cfg, vocab).init(device),
    };
    tracing::info!(
        "Model ready: {} trainable parameters, {} frozen extractor parameters",
        model.num_params(),
        extractor.num_params(),
    );

    let optim = AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Value(cfg.grad_clip)))
        .init::<B, SemComModel<B>>();
    let scheduler = MultiStepLr::new(cfg.lr, cfg.lr_milestones.clone(), cfg.lr_gamma);

    Ok(Trainer::new(
        model,
        extractor,
        optim,
        scheduler,
        AwgnChannel::new(cfg.complex_channel),
        TrainerSettings::new(cfg, vocab),
    ))
}

/// Loader for one epoch: the samples are reshuffled with `seed`, cut
/// into full batches, and the batches are spread over the workers.
/// Worker partitions therefore never produce short batches.
pub fn epoch_loader<B: Backend>(
    dataset:     &SemComDataset,
    batch_size:  usize,
    num_workers: usize,
    seed:        u64,
    device:      &B::Device,
) -> Arc<dyn DataLoader<SemComBatch<B>>> {
    let shuffled = ShuffledDataset::with_seed(dataset.clone(), seed);
    let batches  = FullBatchDataset::new(shuffled, batch_size);
    let workers  = num_workers.min(batches.len()).max(1);

    DataLoaderBuilder::new(PrebatchedBatcher::<B>::new(device.clone()))
        .batch_size(1)
        .num_workers(workers)
        .build(batches)
}

pub fn run_training<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    vocab:   VocabSizes,
    dataset: SemComDataset,
    ckpt:    &CheckpointManager,
    metrics: &MetricsLogger,
    device:  B::Device,
) -> Result<()> {
    tracing::info!("Using device: {:?}", device);
    B::seed(cfg.seed);

    let mut trainer = build_trainer::<B>(cfg, vocab, ckpt, &device)?;

    let remainder = FullBatchDataset::new(dataset.clone(), cfg.batch_size).remainder();
    if remainder > 0 {
        tracing::info!("{} samples do not fill a last batch and are left out each epoch", remainder);
    }

    let mut best_loss = f64::INFINITY;
    for epoch in cfg.epoch_start..cfg.epoch_start + cfg.epochs {
        let loader = epoch_loader::<B>(
            &dataset,
            cfg.batch_size,
            cfg.num_workers,
            cfg.seed.wrapping_add(epoch as u64),
            &device,
        );
        let epoch_metrics = trainer.train_epoch(epoch, loader.iter())?;
        if epoch_metrics.is_improvement(best_loss) {
            best_loss = epoch_metrics.mean_loss;
            tracing::info!("Epoch {} mean loss improved to {:.4}", epoch, best_loss);
        }
        metrics.log(&epoch_metrics)?;

        if trainer.finish_epoch(epoch, ckpt)? {
            tracing::info!("Checkpoint saved to '{}' for epoch {}", ckpt.dir().display(), epoch);
        }
    }

    tracing::info!("Training complete!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::data::dataset::SemComSample;
    use crate::infra::checkpoint::{FULL_TRANSFORMER, KNOWLEDGE_EMBEDDING};
    use burn::{
        backend::{Autodiff, NdArray},
        module::Param,
        record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    };

    type Inner = NdArray;
    type TestBackend = Autodiff<Inner>;

    const VOCAB: VocabSizes = VocabSizes { words: 12, triples: 5 };

    fn tiny_config() -> TrainConfig {
        TrainConfig {
            batch_size:       2,
            max_triples:      3,
            max_sentence_len: 6,
            d_model:          8,
            num_heads:        2,
            encoder_layers:   1,
            decoder_layers:   1,
            d_ff:             16,
            channel_dim:      4,
            extractor_layers: 1,
            extractor_d_ff:   16,
            dropout:          0.0,
            log_every:        1,
            ..TrainConfig::default()
        }
    }

    fn optimizer(cfg: &TrainConfig) -> impl Optimizer<SemComModel<TestBackend>, TestBackend> {
        AdamConfig::new()
            .with_grad_clipping(Some(GradientClippingConfig::Value(cfg.grad_clip)))
            .init::<TestBackend, SemComModel<TestBackend>>()
    }

    fn trainer_with(
        extractor: KnowledgeExtractor<Inner>,
    ) -> Trainer<TestBackend, impl Optimizer<SemComModel<TestBackend>, TestBackend>> {
        let cfg    = tiny_config();
        let device = Default::default();
        let transformer = transformer_config(&cfg, VOCAB)
            .init::<TestBackend>(&device)
            .with_decoder(decoder_config(&cfg).init(&device));
        let model = SemComModel {
            transformer,
            knowledge: knowledge_config(&cfg, VOCAB).init(&device),
        };
        Trainer::new(
            model,
            extractor,
            optimizer(&cfg),
            MultiStepLr::new(cfg.lr, cfg.lr_milestones.clone(), cfg.lr_gamma),
            AwgnChannel::new(cfg.complex_channel),
            TrainerSettings::new(&cfg, VOCAB),
        )
    }

    fn random_extractor() -> KnowledgeExtractor<Inner> {
        extractor_config(&tiny_config(), VOCAB).init(&Default::default())
    }

    /// An extractor whose output ignores its input: triples 0 and 2
    /// are always relevant, the rest never.
    fn fixed_extractor() -> KnowledgeExtractor<Inner> {
        let device = Default::default();
        let mut extractor = random_extractor();
        extractor.head.weight = Param::from_tensor(Tensor::zeros([8, VOCAB.triples], &device));
        extractor.head.bias = Some(Param::from_tensor(Tensor::from_data(
            TensorData::new(vec![10.0f32, -10.0, 10.0, -10.0, -10.0], [VOCAB.triples]),
            &device,
        )));
        extractor
    }

    fn batch(rows: usize) -> SemComBatch<TestBackend> {
        let device = Default::default();
        let sentences: Vec<i64> = [vec![2, 5, 6, 7, 3, 0], vec![2, 8, 3, 0, 0, 0]]
            .into_iter()
            .cycle()
            .take(rows)
            .flatten()
            .collect();
        let triples: Vec<i64> = [vec![0, 2, 5], vec![5, 5, 5]]
            .into_iter()
            .cycle()
            .take(rows)
            .flatten()
            .collect();
        let lengths: Vec<i64> = [5, 3].into_iter().cycle().take(rows).collect();

        SemComBatch {
            sentences: Tensor::from_data(TensorData::new(sentences, [rows, 6]), &device),
            triples:   Tensor::from_data(TensorData::new(triples, [rows, 3]), &device),
            lengths:   Tensor::from_data(TensorData::new(lengths, [rows]), &device),
        }
    }

    /// Every parameter of the extractor, serialised at full precision.
    fn extractor_bytes(extractor: &KnowledgeExtractor<Inner>) -> Vec<u8> {
        BinBytesRecorder::<FullPrecisionSettings>::default()
            .record(extractor.clone().into_record(), ())
            .unwrap()
    }

    /// Sentences [BOS] w [EOS] with w cycling through the word ids.
    fn numbered_dataset(n: usize, seq_len: usize) -> SemComDataset {
        SemComDataset::new(
            (0..n as u32)
                .map(|i| {
                    let mut sentence = vec![2, 4 + i % 8, 3];
                    sentence.resize(seq_len, 0);
                    SemComSample { sentence, triples: vec![0, 5, 5], length: 3 }
                })
                .collect(),
        )
    }

    fn first_ids(batch: &SemComBatch<Inner>) -> Vec<i64> {
        batch
            .sentences
            .clone()
            .slice([0..batch.batch_size(), 1..2])
            .into_data()
            .convert::<i64>()
            .to_vec()
            .unwrap()
    }

    fn values<const D: usize>(t: Tensor<Inner, D>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec().unwrap()
    }

    #[test]
    fn test_memory_covers_text_and_knowledge() {
        let mut trainer = trainer_with(random_extractor());
        let step = trainer.forward(&batch(2)).unwrap();

        // 6 tokens shifted to 5 text positions, plus max_triples.
        assert_eq!(step.memory_len, 5 + 3);
        assert_eq!(step.memory_pad_len, 5 + 3);
        assert_eq!(step.selected.len(), 2);
        assert!(step.selected.iter().all(|ids| ids.len() == 3));
        assert!(step.loss.into_scalar().elem::<f64>().is_finite());
    }

    #[test]
    fn test_fixed_extractor_selection() {
        let mut trainer = trainer_with(fixed_extractor());
        let report = trainer.train_step(&batch(2)).unwrap();
        assert_eq!(report.selected, vec![vec![0, 2, 5], vec![0, 2, 5]]);
    }

    #[test]
    fn test_snr_stays_in_range() {
        let mut trainer = trainer_with(random_extractor());
        let draws: Vec<i32> = (0..2000).map(|_| trainer.sample_snr()).collect();
        assert!(draws.iter().all(|s| (-5..10).contains(s)));
        assert!(draws.contains(&-5));
        assert!(draws.contains(&9));
    }

    #[test]
    fn test_step_snr_is_reported_in_range() {
        let mut trainer = trainer_with(random_extractor());
        for _ in 0..3 {
            let report = trainer.train_step(&batch(2)).unwrap();
            assert!((-5..10).contains(&report.snr_db));
        }
    }

    #[test]
    fn test_extractor_is_frozen_while_model_trains() {
        let mut trainer = trainer_with(fixed_extractor());

        let extractor_before = extractor_bytes(trainer.extractor());
        let gen_before  = values(trainer.model().transformer.generator.weight.val().inner());
        let emb_before  = values(trainer.model().knowledge.embedding.weight.val().inner());

        for _ in 0..3 {
            trainer.train_step(&batch(2)).unwrap();
        }

        assert_eq!(extractor_bytes(trainer.extractor()), extractor_before);

        let gen_after = values(trainer.model().transformer.generator.weight.val().inner());
        let emb_after = values(trainer.model().knowledge.embedding.weight.val().inner());
        assert_ne!(gen_before, gen_after);
        // Triples 0 and 2 were selected, so their rows moved.
        assert_ne!(emb_before, emb_after);
    }

    #[test]
    fn test_encoder_receives_no_update() {
        let mut trainer = trainer_with(fixed_extractor());
        let before = values(trainer.model().transformer.channel.to_channel.weight.val().inner());
        trainer.train_step(&batch(2)).unwrap();
        let after = values(trainer.model().transformer.channel.to_channel.weight.val().inner());
        assert_eq!(before, after);
    }

    #[test]
    fn test_partial_batches_are_dropped() {
        let mut trainer = trainer_with(fixed_extractor());
        let metrics = trainer.train_epoch(1, vec![batch(2), batch(1)]).unwrap();
        assert_eq!(metrics.batches, 1);
        assert_eq!(metrics.skipped, 1);
        assert!(metrics.mean_loss.is_finite());
        // Row 0 has ground truth {0, 2}, both always selected.
        assert_eq!(metrics.triple_recall, 1.0);
    }

    #[test]
    fn test_checkpoints_only_every_tenth_epoch() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path(), dir.path().join("out")).unwrap();
        let mut trainer = trainer_with(random_extractor());

        let mut saved_at = Vec::new();
        for epoch in 1..=12 {
            let saved = trainer.finish_epoch(epoch, &ckpt).unwrap();
            assert_eq!(ckpt.record_path(FULL_TRANSFORMER).exists(), epoch >= 10);
            assert_eq!(ckpt.record_path(KNOWLEDGE_EMBEDDING).exists(), epoch >= 10);
            if saved {
                saved_at.push(epoch);
            }
        }
        assert_eq!(saved_at, vec![10]);
        assert!(should_checkpoint(20, 10) && !should_checkpoint(21, 10));
    }

    #[test]
    fn test_learning_rate_follows_schedule() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path(), dir.path().join("out")).unwrap();
        let mut trainer = trainer_with(random_extractor());

        let mut lr_during = Vec::new();
        for epoch in 1..=41 {
            lr_during.push(trainer.learning_rate());
            trainer.finish_epoch(epoch, &ckpt).unwrap();
        }
        assert_eq!(lr_during[0], 1e-4);
        assert_eq!(lr_during[10], 0.5e-4);  // epoch 11
        assert_eq!(lr_during[20], 0.25e-4); // epoch 21
        assert_eq!(lr_during[40], 0.125e-4); // epoch 41
    }

    #[test]
    fn test_build_trainer_from_pretrained_records() {
        let dir    = tempfile::tempdir().unwrap();
        let cfg    = tiny_config();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(dir.path().join("pre"), dir.path().join("out")).unwrap();

        // Missing pretrained records are fatal.
        assert!(build_trainer::<TestBackend>(&cfg, VOCAB, &ckpt, &device).is_err());

        let base = transformer_config(&cfg, VOCAB).init::<Inner>(&device);
        ckpt.save_pretrained_base(&base).unwrap();
        ckpt.save_pretrained_extractor(&random_extractor()).unwrap();

        let mut trainer = build_trainer::<TestBackend>(&cfg, VOCAB, &ckpt, &device).unwrap();
        let loaded = values(trainer.model().transformer.generator.weight.val().inner());
        let saved  = values(base.generator.weight.val());
        assert_eq!(loaded, saved);

        let report = trainer.train_step(&batch(2)).unwrap();
        assert!(report.loss.is_finite());

        let empty = VocabSizes { triples: 0, ..VOCAB };
        assert!(build_trainer::<TestBackend>(&cfg, empty, &ckpt, &device).is_err());
    }

    #[test]
    fn test_reference_loss_through_the_whole_step() {
        let device = Default::default();
        let mut trainer = trainer_with(fixed_extractor());

        // Constant logits: [EOS] scores ln 2, every other word 0, so
        // p([EOS]) = 2/13 and p(w) = 1/13 at every position.
        let mut bias = vec![0.0f32; VOCAB.words];
        bias[3] = 2f32.ln();
        trainer.model.transformer.generator.weight =
            Param::from_tensor(Tensor::zeros([8, VOCAB.words], &device));
        trainer.model.transformer.generator.bias = Some(Param::from_tensor(Tensor::from_data(
            TensorData::new(bias, [VOCAB.words]),
            &device,
        )));

        let step = trainer.forward(&batch(2)).unwrap();
        assert_eq!(step.selected, vec![vec![0, 2, 5], vec![0, 2, 5]]);

        // Real targets: 5 6 7 [EOS] in row 0, 8 [EOS] in row 1.
        // (4·ln 13 + 2·ln(13/2)) / 6 = ln 13 - ln 2 / 3
        let expected = 13f64.ln() - 2f64.ln() / 3.0;
        let loss = step.loss.into_scalar().elem::<f64>();
        assert!((loss - expected).abs() < 1e-5, "{loss} vs {expected}");
    }

    #[test]
    fn test_every_worker_yields_full_batches() {
        let dataset = numbered_dataset(200, 4);
        let loader  = epoch_loader::<Inner>(&dataset, 32, 8, 42, &Default::default());

        let mut sizes = Vec::new();
        let mut seen  = 0usize;
        for batch in loader.iter() {
            sizes.push(batch.batch_size());
            seen += first_ids(&batch).len();
        }
        assert_eq!(sizes, vec![32; 6]);
        assert_eq!(seen, 192);
    }

    #[test]
    fn test_corpus_smaller_than_worker_count_still_batches() {
        let dataset = numbered_dataset(40, 4);
        let loader  = epoch_loader::<Inner>(&dataset, 32, 8, 42, &Default::default());
        let sizes: Vec<usize> = loader.iter().map(|b| b.batch_size()).collect();
        assert_eq!(sizes, vec![32]);
    }

    #[test]
    fn test_each_epoch_reshuffles() {
        let dataset = numbered_dataset(40, 4);
        let device  = Default::default();
        let order = |seed| -> Vec<i64> {
            epoch_loader::<Inner>(&dataset, 40, 1, seed, &device)
                .iter()
                .flat_map(|b| first_ids(&b))
                .collect()
        };
        assert_eq!(order(7), order(7));
        assert_ne!(order(7), order(8));

        let distinct: BTreeSet<i64> = order(7).into_iter().collect();
        assert_eq!(distinct.len(), 8);
    }

    #[test]
    fn test_epoch_over_loader_takes_every_full_batch() {
        let cfg     = tiny_config();
        let dataset = numbered_dataset(5, cfg.max_sentence_len);
        let loader  = epoch_loader::<TestBackend>(&dataset, cfg.batch_size, 8, 1, &Default::default());

        let mut trainer = trainer_with(fixed_extractor());
        let metrics = trainer.train_epoch(1, loader.iter()).unwrap();
        assert_eq!(metrics.batches, 2);
        assert_eq!(metrics.skipped, 0);
        assert!(metrics.mean_loss.is_finite());
    }
}
