//! Pipeline stages for PDF-to-cards generation.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and the I/O-bound ones (extraction, completion) can
//! be swapped for fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ normalize ──▶ chunk ──▶ llm ──▶ recover ──▶ combine
//! (bytes)   (text)      (cleaned)     (split)  (reply)  (JSON)     (cards)
//! ```
//!
//! 1. [`input`]: validate the upload / path / URL and load PDF bytes
//! 2. [`extract`]: PDF bytes to raw text (pdfium locally, or a cloud
//!    service)
//! 3. [`normalize`]: regex cleanup of extraction artefacts
//! 4. [`chunk`]: fixed-width split of long text; per-key combination
//!    of per-chunk cards
//! 5. [`llm`]: send one prompt, drain the streamed reply
//! 6. [`recover`]: salvage the JSON object from the reply

pub mod chunk;
pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod recover;
