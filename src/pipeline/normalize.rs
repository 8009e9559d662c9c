//! Normalisation: deterministic cleanup of extracted PDF text.
//!
//! PDF text layers come out with hard line wraps, words hyphenated across
//! lines, tab-separated columns and ragged blank lines. The model copes with
//! most of that, but every stray character costs prompt tokens and the chunk
//! splitter counts characters, so the text is flattened first.
//!
//! ## Rule Order
//!
//! Paragraphs are split before anything else so blank-line boundaries
//! survive the whitespace collapse. Inside a paragraph the hyphen rejoin must
//! run before the collapse (it needs the line break to find the split word),
//! and sentence breaks are inserted last, on already-collapsed text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean raw extracted text.
///
/// Output invariants:
/// - paragraphs are separated by exactly one blank line;
/// - no `word-\nfragment` breaks remain;
/// - no tabs; every sentence ending in `.`, `!` or `?` starts a new line.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(input: &str) -> String {
    let s = normalise_line_endings(input);
    split_paragraphs(&s)
        .into_iter()
        .map(clean_paragraph)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn clean_paragraph(paragraph: &str) -> String {
    let s = rejoin_hyphenated(paragraph);
    let s = collapse_whitespace(&s);
    break_sentences(s.trim())
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Split on blank lines ─────────────────────────────────────────────

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

fn split_paragraphs(input: &str) -> Vec<&str> {
    RE_PARAGRAPH_BREAK.split(input).collect()
}

// ── Rule 3: Rejoin words hyphenated across a line break ──────────────────────

static RE_HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w)-[ \t]*\n[ \t]*(\w)").unwrap());

fn rejoin_hyphenated(input: &str) -> String {
    RE_HYPHEN_BREAK.replace_all(input, "$1$2").to_string()
}

// ── Rule 4: Collapse whitespace runs ─────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input, " ").to_string()
}

// ── Rule 5: One sentence per line ────────────────────────────────────────────

static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?])\s+").unwrap());

fn break_sentences(input: &str) -> String {
    RE_SENTENCE_END.replace_all(input, "$1\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
