//! # pdf2cards
//!
//! Turn a research paper (PDF) into a short set of social-media "cards"
//! written for a lay audience: a hook, the research question, who did it,
//! how, what they found, why it matters, and a closing line.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      upload, local file or URL → validated PDF bytes
//!  ├─ 2. Extract    pdfium (spawn_blocking) or a cloud extraction service
//!  ├─ 3. Normalize  rejoin hyphenated words, collapse whitespace,
//!  │                one sentence per line
//!  ├─ 4. Chunk      fixed-width split when the text is long
//!  ├─ 5. LLM        one prompt per chunk, streamed reply drained in order
//!  ├─ 6. Recover    salvage the JSON object from the free-text reply
//!  └─ 7. Combine    per-key, space-joined, in chunk order
//! ```
//!
//! Every stage either succeeds or aborts the run with a
//! [`Pdf2CardsError`]. There are no retries and no partial results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2cards::{generate, CardConfig, DocumentSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / GROQ_API_KEY / …
//!     let config = CardConfig::default();
//!     let output = generate(DocumentSource::from_input("paper.pdf")?, &config).await?;
//!     println!("{}", output.cards.to_pretty_json());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdf2cards` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | on      | Enables [`server`], the axum HTTP front end |
//!
//! Disable both when using only the library:
//! ```toml
//! pdf2cards = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CardConfig, CardConfigBuilder, ExtractorBackend};
pub use convert::{
    completion_from_config, generate, generate_cards, generate_sync, generate_to_file,
    write_atomic,
};
pub use error::{ErrorKind, Pdf2CardsError};
pub use output::{CardOutput, CardSummary, ChunkResult, GenerationStats};
pub use pipeline::chunk::{combine, split, TextChunk};
pub use pipeline::extract::{
    extractor_from_config, PdfServicesCredentials, PdfServicesExtractor, PdfiumExtractor,
    TextExtractor,
};
pub use pipeline::input::DocumentSource;
pub use pipeline::llm::{aggregate, CompletionSource, FragmentStream, ProviderCompletion};
pub use pipeline::normalize::normalize;
pub use pipeline::recover::{recover_card, recover_json};
pub use progress::{CardProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::render_prompt;
pub use schema::{CardField, CardSchema};
