// ============================================================
// Layer 3 — Special Tokens
// ============================================================
// Reserved ids of the word-level tokenizer. They are fixed so
// the batcher, the mask builders and the loss can agree on
// them without a tokenizer instance at hand.

/// Padding token. Masks treat every position holding it as empty.
pub const PAD_ID: u32 = 0;

/// Out-of-vocabulary words map here.
pub const UNK_ID: u32 = 1;

/// Start-of-sentence marker, first token of every row.
pub const BOS_ID: u32 = 2;

/// End-of-sentence marker, last real token of every row.
pub const EOS_ID: u32 = 3;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const BOS_TOKEN: &str = "[BOS]";
pub const EOS_TOKEN: &str = "[EOS]";

/// Number of reserved ids; ordinary words start here.
pub const NUM_SPECIAL: u32 = 4;
