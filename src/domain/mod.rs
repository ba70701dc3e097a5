// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits for the core concepts of the
// semantic communication trainer.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, functions and traits
//
// What lives here:
//   - CorpusEntry: one sentence with its knowledge triples
//   - Special token ids shared by tokenizer, batcher and loss
//   - TripleVocab and the fixed-width triple selection used
//     both for ground-truth padding and extractor output
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A sentence and the knowledge triples it verbalises
pub mod entry;

// Reserved token ids ([PAD], [UNK], [BOS], [EOS])
pub mod tokens;

// Knowledge triple vocabulary and index selection
pub mod triples;

// Core abstractions (traits) that other layers implement
pub mod traits;
