// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to any one layer:
//
//   checkpoint.rs   — Loading the pretrained transformer and
//                     knowledge extractor, writing the trained
//                     records and the run's TrainConfig.
//                     Uses Burn's full-precision MessagePack recorder.
//
//   vocab_store.rs  — Tokenizer and triple vocabulary
//                     persistence. Built from the corpus once,
//                     then always reloaded so ids stay aligned
//                     with the pretrained weights.
//
//   metrics.rs      — Per-epoch CSV log (loss, learning rate,
//                     knowledge recall).
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Pretrained loading and trained-record saving
pub mod checkpoint;

/// Tokenizer and triple vocabulary persistence
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
