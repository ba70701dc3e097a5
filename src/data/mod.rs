// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the corpus file on disk to device-resident
// tensor batches.
//
//   corpus.json
//       │
//       ▼
//   CorpusLoader      → reads the JSON array of entries
//       │
//       ▼
//   Preprocessor      → normalises sentence text
//       │
//       ▼
//   SampleBuilder     → [BOS] ids [EOS] [PAD]..., triple ids
//       │
//       ▼
//   SemComDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   ShuffledDataset   → new order every epoch
//       │
//       ▼
//   FullBatchDataset  → one item per full batch, remainder left out
//       │
//       ▼
//   PrebatchedBatcher → stacks one item into a tensor batch
//       │
//       ▼
//   DataLoader        → batch_size 1, several workers
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads WebNLG-style JSON corpora
pub mod loader;

/// Cleans and normalises raw sentence text
pub mod preprocessor;

/// Fixed-width samples and Burn's Dataset trait
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
