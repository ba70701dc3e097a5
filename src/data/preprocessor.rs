// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises corpus sentences before tokenisation.
//
// WebNLG sentences are single lines, but scraped references
// still carry stray tabs, non-breaking spaces and zero-width
// characters. Left alone, the word-level tokenizer would keep
// them glued to neighbouring words and waste vocabulary slots.
//
// Cleaning steps (applied in order):
//   1. Replace Unicode whitespace variants and control
//      characters with a plain space
//   2. Collapse runs of spaces into one
//   3. Trim both ends
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean a single sentence. Newlines are treated like any other
    /// whitespace since a corpus entry is one sentence.
    pub fn clean(&self, text: &str) -> String {
        let normalised = text.chars().map(|c| match c {
            '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
            c if c.is_whitespace() || c.is_control() => ' ',
            c => c,
        });

        let mut out        = String::with_capacity(text.len());
        let mut last_space = true;
        for c in normalised {
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        out.trim_end().to_string()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
