// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, runs or trains a Burn module lives
// here. The data and infra layers only hand tensors in and
// records out.
//
// What's in this layer:
//
//   model.rs     — Semantic transformer: token embeddings,
//                  encoder, channel codec, swappable text
//                  decoder, generator
//
//   knowledge.rs — Frozen knowledge extractor and the trainable
//                  triple embedding
//
//   channel.rs   — AWGN channel with power normalisation
//
//   masks.rs     — Teacher-forcing shift and attention masks
//
//   loss.rs      — Length-masked cross-entropy
//
//   schedule.rs  — Multi-step learning rate decay
//
//   trainer.rs   — The fine-tuning loop
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Semantic transformer architecture
pub mod model;

/// Knowledge extractor and knowledge embedding
pub mod knowledge;

pub mod channel;

pub mod masks;

pub mod loss;

pub mod schedule;

/// Training loop with checkpointing
pub mod trainer;
