//! Text extraction: PDF bytes → raw document text.
//!
//! Two interchangeable strategies sit behind [`TextExtractor`]:
//!
//! - [`PdfiumExtractor`]: local parsing with pdfium, run on the blocking
//!   pool.
//! - [`PdfServicesExtractor`]: upload to a cloud document-conversion
//!   service and collect its text elements.
//!
//! URL inputs are downloaded by [`crate::pipeline::input`] first, so both
//! strategies only ever see bytes.

pub mod pdf_services;
pub mod pdfium;

pub use pdf_services::{PdfServicesCredentials, PdfServicesExtractor};
pub use pdfium::PdfiumExtractor;

use crate::config::{CardConfig, ExtractorBackend};
use crate::error::Pdf2CardsError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Turns a PDF into linear text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Short name for logs and stats.
    fn name(&self) -> &str;

    /// Extract the text of `pdf`. `label` names the document in errors.
    async fn extract(&self, label: &str, pdf: &[u8]) -> Result<String, Pdf2CardsError>;
}

/// Build the extractor selected by `config.extractor`.
///
/// The cloud backend reads its credentials from the environment; see
/// [`PdfServicesCredentials::from_env`].
pub fn extractor_from_config(config: &CardConfig) -> Result<Arc<dyn TextExtractor>, Pdf2CardsError> {
    match config.extractor {
        ExtractorBackend::Pdfium => Ok(Arc::new(PdfiumExtractor::new(config.password.clone()))),
        ExtractorBackend::PdfServices => {
            let credentials = PdfServicesCredentials::from_env()?;
            let extractor = PdfServicesExtractor::new(credentials)?
                .with_poll_timeout(Duration::from_secs(config.poll_timeout_secs));
            Ok(Arc::new(extractor))
        }
    }
}
