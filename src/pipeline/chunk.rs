//! Chunking: split long text for separate prompts, merge the answers.
//!
//! Papers longer than the model's comfortable context are cut into
//! fixed-width slices. Each slice gets its own prompt and its own card
//! summary; [`combine`] then glues the per-chunk values back together key by
//! key, in chunk order.
//!
//! The split is a plain character-count cut. It can land in the middle of a
//! word or sentence, which costs the model a little context at each seam;
//! that is accepted in exchange for exact, predictable chunk sizes.

use crate::output::CardSummary;
use crate::schema::CardSchema;

/// A contiguous slice of cleaned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// 0-indexed position in the document.
    pub index: usize,
    pub text: String,
}

impl TextChunk {
    /// Length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Split `text` into consecutive slices of at most `max_width` characters.
///
/// Widths count Unicode scalar values, so a slice never ends inside a
/// multi-byte character. Empty input yields no chunks; a width of 0 is
/// treated as 1.
pub fn split(text: &str, max_width: usize) -> Vec<TextChunk> {
    let width = max_width.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (byte_idx, _) in text.char_indices() {
        if count == width {
            chunks.push(TextChunk {
                index: chunks.len(),
                text: text[start..byte_idx].to_string(),
            });
            start = byte_idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(TextChunk {
            index: chunks.len(),
            text: text[start..].to_string(),
        });
    }

    chunks
}

/// Merge per-chunk summaries into one.
///
/// For each schema key, the values from every partial are joined with a
/// single space in the order given, then trimmed. A partial missing a key
/// contributes an empty string. Keys outside the schema are ignored.
pub fn combine(schema: &CardSchema, partials: &[CardSummary]) -> CardSummary {
    let mut combined = CardSummary::default();
    for key in schema.keys() {
        let joined = partials
            .iter()
            .map(|p| p.get(key).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" ");
        combined.set(key, joined.trim());
    }
    combined
}
