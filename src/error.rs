//! Error types for the pdf2cards library.
//!
//! Every failure in the pipeline is fatal for the request: there are no
//! retries and no partial-success results, so a single error type,
//! [`Pdf2CardsError`], travels from whichever stage failed up to the caller.
//!
//! Callers that need to branch on the *stage* rather than the exact variant
//! (the HTTP layer maps stages to status codes) use [`Pdf2CardsError::kind`],
//! which folds the variants into a small, stable [`ErrorKind`] set.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2cards library.
#[derive(Debug, Error)]
pub enum Pdf2CardsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Neither a PDF payload nor a URL was supplied.
    #[error("No input provided: upload a PDF file or supply a PDF URL")]
    MissingInput,

    /// Both a PDF payload and a URL were supplied.
    #[error("Ambiguous input: provide either a PDF file or a URL, not both")]
    AmbiguousInput,

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// The payload was declared as something other than a PDF.
    #[error("Only PDF files are allowed (got content type '{content_type}')")]
    NotAPdf { content_type: String },

    /// The payload does not start with the `%PDF` magic bytes.
    #[error("Payload '{name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdfBytes { name: String, magic: Vec<u8> },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide,\n\
or use the cloud extractor (--extractor pdf-services).\n"
    )]
    PdfiumBindingFailed(String),

    /// The remote extraction service rejected the request or failed the job.
    #[error("Extraction service '{service}' failed: {detail}")]
    ExtractionService { service: String, detail: String },

    /// Extraction succeeded but produced no usable text.
    #[error("No text could be extracted from '{name}'. It may be image-based or empty.")]
    EmptyDocument { name: String },

    // ── Completion errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM call (or its fragment stream) failed.
    #[error("LLM completion failed for chunk {chunk}: {detail}")]
    CompletionFailed { chunk: usize, detail: String },

    /// The LLM call did not finish within `api_timeout_secs`.
    #[error("LLM completion timed out after {secs}s on chunk {chunk}")]
    CompletionTimeout { chunk: usize, secs: u64 },

    // ── Response recovery errors ──────────────────────────────────────────
    /// The model response contains no `{ … }` span at all.
    #[error("No JSON structure found in the model response")]
    NoJsonStructureFound,

    /// Neither the strict parse nor the filtered retry produced an object.
    #[error("Model response could not be repaired into a JSON object: {detail}")]
    UnrecoverableJson { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request itself was unusable (no input, not a PDF, bad path).
    Input,
    /// The PDF could not be fetched or turned into text.
    Extraction,
    /// The LLM call failed.
    Completion,
    /// The model reply contained no JSON object.
    NoJsonStructureFound,
    /// The model reply contained a JSON-like span that could not be repaired.
    UnrecoverableJson,
    /// Invalid configuration.
    Config,
    /// Anything else.
    Internal,
}

impl Pdf2CardsError {
    /// Classify this error by the pipeline stage it came from.
    pub fn kind(&self) -> ErrorKind {
        use Pdf2CardsError::*;
        match self {
            MissingInput
            | AmbiguousInput
            | InvalidInput { .. }
            | NotAPdf { .. }
            | NotAPdfBytes { .. }
            | FileNotFound { .. }
            | PermissionDenied { .. } => ErrorKind::Input,
            DownloadFailed { .. }
            | DownloadTimeout { .. }
            | CorruptPdf { .. }
            | PasswordRequired { .. }
            | WrongPassword { .. }
            | PdfiumBindingFailed(_)
            | ExtractionService { .. }
            | EmptyDocument { .. } => ErrorKind::Extraction,
            ProviderNotConfigured { .. } | CompletionFailed { .. } | CompletionTimeout { .. } => {
                ErrorKind::Completion
            }
            NoJsonStructureFound => ErrorKind::NoJsonStructureFound,
            UnrecoverableJson { .. } => ErrorKind::UnrecoverableJson,
            InvalidConfig(_) => ErrorKind::Config,
            OutputWriteFailed { .. } | Internal(_) => ErrorKind::Internal,
        }
    }
}
