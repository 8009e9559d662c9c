//! Input resolution: turn an upload, a path or a URL into PDF bytes.
//!
//! Everything that can be rejected cheaply is rejected here, before any
//! extractor or model is touched: a declared non-PDF content type, a missing
//! file, a URL that does not answer, bytes without the `%PDF` magic.

use crate::error::Pdf2CardsError;
use std::path::PathBuf;
use tracing::{debug, info};

const PDF_MIME: &str = "application/pdf";
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Where the PDF comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// An in-memory payload, e.g. an HTTP upload.
    Bytes {
        data: Vec<u8>,
        /// Declared MIME type, if the sender gave one.
        content_type: Option<String>,
        filename: Option<String>,
    },
    /// A remote PDF.
    Url(String),
    /// A local file.
    Path(PathBuf),
}

impl DocumentSource {
    /// Classify a CLI-style argument as a URL or a local path.
    pub fn from_input(input: &str) -> Result<Self, Pdf2CardsError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Pdf2CardsError::MissingInput);
        }
        if is_url(input) {
            Ok(Self::Url(input.to_string()))
        } else if input.contains("://") {
            Err(Pdf2CardsError::InvalidInput {
                input: input.to_string(),
            })
        } else {
            Ok(Self::Path(PathBuf::from(input)))
        }
    }

    /// Pick the one supplied input out of an optional upload and an optional
    /// URL (the shape of the HTTP form).
    pub fn from_parts(
        upload: Option<(Vec<u8>, Option<String>, Option<String>)>,
        url: Option<String>,
    ) -> Result<Self, Pdf2CardsError> {
        let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        match (upload, url) {
            (Some(_), Some(_)) => Err(Pdf2CardsError::AmbiguousInput),
            (Some((data, content_type, filename)), None) => Ok(Self::Bytes {
                data,
                content_type,
                filename,
            }),
            (None, Some(url)) if is_url(&url) => Ok(Self::Url(url)),
            (None, Some(url)) => Err(Pdf2CardsError::InvalidInput { input: url }),
            (None, None) => Err(Pdf2CardsError::MissingInput),
        }
    }

    /// Human-readable label for logs and error messages.
    pub fn display_name(&self) -> String {
        match self {
            Self::Bytes { filename, .. } => filename.clone().unwrap_or_else(|| "upload".into()),
            Self::Url(url) => url.clone(),
            Self::Path(p) => p.display().to_string(),
        }
    }

    /// Reject what can be rejected without I/O.
    pub fn validate(&self) -> Result<(), Pdf2CardsError> {
        match self {
            Self::Bytes { content_type, .. } => match content_type {
                Some(ct) => check_content_type(ct),
                None => Ok(()),
            },
            Self::Url(url) if !is_url(url) => Err(Pdf2CardsError::InvalidInput { input: url.clone() }),
            _ => Ok(()),
        }
    }
}

/// PDF bytes plus a label to report them by.
#[derive(Debug, Clone)]
pub struct PdfPayload {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Accept `application/pdf` (any case, parameters ignored), reject the rest.
pub fn check_content_type(content_type: &str) -> Result<(), Pdf2CardsError> {
    if is_pdf_mime(content_type) {
        Ok(())
    } else {
        Err(Pdf2CardsError::NotAPdf {
            content_type: content_type.to_string(),
        })
    }
}

fn is_pdf_mime(content_type: &str) -> bool {
    mime_essence(content_type) == PDF_MIME
}

fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Verify the `%PDF` magic bytes.
pub fn check_magic(name: &str, bytes: &[u8]) -> Result<(), Pdf2CardsError> {
    if bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] == PDF_MAGIC {
        return Ok(());
    }
    Err(Pdf2CardsError::NotAPdfBytes {
        name: name.to_string(),
        magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
    })
}

/// Validate `source` and load its bytes.
pub async fn resolve_source(
    source: DocumentSource,
    download_timeout_secs: u64,
) -> Result<PdfPayload, Pdf2CardsError> {
    source.validate()?;
    let name = source.display_name();
    let bytes = match source {
        DocumentSource::Bytes { data, .. } => data,
        DocumentSource::Url(url) => fetch_url(&url, download_timeout_secs).await?,
        DocumentSource::Path(path) => read_local(path).await?,
    };
    check_magic(&name, &bytes)?;
    debug!("Resolved '{}' ({} bytes)", name, bytes.len());
    Ok(PdfPayload { name, bytes })
}

/// Read a local file.
async fn read_local(path: PathBuf) -> Result<Vec<u8>, Pdf2CardsError> {
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Pdf2CardsError::PermissionDenied { path })
        }
        Err(_) => Err(Pdf2CardsError::FileNotFound { path }),
    }
}

/// Download a URL into memory.
pub async fn fetch_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, Pdf2CardsError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Pdf2CardsError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            Pdf2CardsError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Pdf2CardsError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(Pdf2CardsError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    // Servers often label PDFs as generic binary; anything else named
    // explicitly (text/html error pages, images) is rejected.
    if let Some(ct) = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        let essence = mime_essence(ct);
        if essence != PDF_MIME && essence != "application/octet-stream" {
            return Err(Pdf2CardsError::NotAPdf {
                content_type: ct.to_string(),
            });
        }
    }

    let bytes = response.bytes().await.map_err(map_send_err)?;
    info!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}
