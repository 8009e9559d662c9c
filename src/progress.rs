//! Progress-callback trait for card-generation events.
//!
//! Inject an [`Arc<dyn CardProgressCallback>`] via
//! [`crate::config::CardConfigBuilder::progress_callback`] to be told when
//! extraction finishes and as each chunk goes through the model.
//!
//! # Example
//!
//! ```rust
//! use pdf2cards::{CardProgressCallback, CardConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl CardProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, index: usize, total: usize, response_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("chunk {}/{} done ({} chars)", index + 1, total, response_len);
//!     }
//! }
//!
//! let config = CardConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline at each stage boundary.
///
/// All methods default to no-ops. Chunk indices are 0-based.
pub trait CardProgressCallback: Send + Sync {
    /// Raw text is available; `chars` is its length before normalisation.
    fn on_extraction_complete(&self, chars: usize) {
        let _ = chars;
    }

    /// About to send `total_chunks` prompts (1 when the text is not split).
    fn on_generation_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    fn on_chunk_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// A chunk's response was aggregated and recovered.
    fn on_chunk_complete(&self, index: usize, total: usize, response_len: usize) {
        let _ = (index, total, response_len);
    }

    /// A chunk failed; the run aborts right after this call.
    fn on_chunk_error(&self, index: usize, total: usize, error: String) {
        let _ = (index, total, error);
    }

    /// Every chunk succeeded and the cards are assembled.
    fn on_generation_complete(&self, total_chunks: usize) {
        let _ = total_chunks;
    }
}

/// Default when no callback is configured.
pub struct NoopProgressCallback;

impl CardProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CardConfig`].
pub type ProgressCallback = Arc<dyn CardProgressCallback>;
