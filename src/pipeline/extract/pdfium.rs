//! Local extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and
//! keeps thread-local state. The whole load-and-read pass runs on Tokio's
//! blocking pool so async workers never stall on a large document.

use super::TextExtractor;
use crate::error::Pdf2CardsError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Extracts the text layer of every page with pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    password: Option<String>,
}

impl PdfiumExtractor {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    fn name(&self) -> &str {
        "pdfium"
    }

    async fn extract(&self, label: &str, pdf: &[u8]) -> Result<String, Pdf2CardsError> {
        let bytes = pdf.to_vec();
        let label = label.to_string();
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || extract_blocking(&label, &bytes, password.as_deref()))
            .await
            .map_err(|e| Pdf2CardsError::Internal(format!("Extraction task panicked: {}", e)))?
    }
}

/// Bind pdfium from `PDFIUM_LIB_PATH` when set, else the system library.
fn bind_pdfium() -> Result<Pdfium, Pdf2CardsError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.is_empty() => {
            debug!("Binding pdfium from {}", path);
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| Pdf2CardsError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of text extraction.
fn extract_blocking(
    label: &str,
    bytes: &[u8],
    password: Option<&str>,
) -> Result<String, Pdf2CardsError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2CardsError::WrongPassword {
                    name: label.to_string(),
                }
            } else {
                Pdf2CardsError::PasswordRequired {
                    name: label.to_string(),
                }
            }
        } else {
            Pdf2CardsError::CorruptPdf {
                name: label.to_string(),
                detail: err_str,
            }
        }
    })?;

    let mut pages_text = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page.text().map_err(|e| Pdf2CardsError::CorruptPdf {
            name: label.to_string(),
            detail: format!("page {}: {:?}", idx + 1, e),
        })?;
        pages_text.push(text.all());
    }

    info!("Extracted text from {} pages of '{}'", pages_text.len(), label);
    Ok(pages_text.join("\n"))
}
