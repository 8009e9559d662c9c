//! Cloud extraction via the PDF Services REST API.
//!
//! The service works on uploaded assets and asynchronous jobs:
//!
//! ```text
//! POST /token                 client credentials → bearer token
//! POST /assets                → upload URI + asset id
//! PUT  <upload URI>           raw PDF bytes
//! POST /operation/extractpdf  → 201, job URL in `location`
//! GET  <job URL>              poll until status is done / failed
//! GET  <content download URI> structured JSON with text elements
//! ```
//!
//! The text of every element that has one is joined with newlines.

use super::TextExtractor;
use crate::error::Pdf2CardsError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://pdf-services.adobe.io";
pub const CLIENT_ID_ENV: &str = "PDF_SERVICES_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "PDF_SERVICES_CLIENT_SECRET";
pub const BASE_URL_ENV: &str = "PDF_SERVICES_BASE_URL";

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const POLL_TIMEOUT: Duration = Duration::from_secs(300);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SERVICE: &str = "pdf-services";

/// Client credentials for the service.
#[derive(Clone)]
pub struct PdfServicesCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

impl fmt::Debug for PdfServicesCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfServicesCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PdfServicesCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Read `PDF_SERVICES_CLIENT_ID` / `PDF_SERVICES_CLIENT_SECRET`
    /// (and optionally `PDF_SERVICES_BASE_URL`).
    pub fn from_env() -> Result<Self, Pdf2CardsError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    Pdf2CardsError::InvalidConfig(format!(
                        "{name} must be set to use the pdf-services extractor"
                    ))
                })
        };
        let mut creds = Self::new(read(CLIENT_ID_ENV)?, read(CLIENT_SECRET_ENV)?);
        if let Ok(base) = std::env::var(BASE_URL_ENV) {
            if !base.is_empty() {
                creds.base_url = base;
            }
        }
        Ok(creds)
    }
}

/// Extracts text through the remote service.
pub struct PdfServicesExtractor {
    client: Client,
    credentials: PdfServicesCredentials,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl PdfServicesExtractor {
    pub fn new(credentials: PdfServicesCredentials) -> Result<Self, Pdf2CardsError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Pdf2CardsError::Internal(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            client,
            credentials: PdfServicesCredentials {
                base_url: credentials.base_url.trim_end_matches('/').to_string(),
                ..credentials
            },
            poll_interval: POLL_INTERVAL,
            poll_timeout: POLL_TIMEOUT,
        })
    }

    /// Give up on a job that has not finished after `timeout`.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Delay between job status requests.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.credentials.base_url, path)
    }

    async fn fetch_token(&self) -> Result<String, Pdf2CardsError> {
        let response = self
            .client
            .post(self.url("/token"))
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| service_error(format!("token request failed: {e}")))?;
        let token: TokenResponse = json_or_error(response, "token").await?;
        Ok(token.access_token)
    }

    async fn upload(&self, token: &str, pdf: &[u8]) -> Result<String, Pdf2CardsError> {
        let response = self
            .client
            .post(self.url("/assets"))
            .bearer_auth(token)
            .header("X-API-Key", &self.credentials.client_id)
            .json(&serde_json::json!({ "mediaType": "application/pdf" }))
            .send()
            .await
            .map_err(|e| service_error(format!("asset creation failed: {e}")))?;
        let asset: AssetResponse = json_or_error(response, "asset creation").await?;

        let response = self
            .client
            .put(&asset.upload_uri)
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(pdf.to_vec())
            .send()
            .await
            .map_err(|e| service_error(format!("upload failed: {e}")))?;
        ensure_success(response, "upload").await?;

        debug!("Uploaded {} bytes as asset {}", pdf.len(), asset.asset_id);
        Ok(asset.asset_id)
    }

    async fn submit(&self, token: &str, asset_id: &str) -> Result<String, Pdf2CardsError> {
        let response = self
            .client
            .post(self.url("/operation/extractpdf"))
            .bearer_auth(token)
            .header("X-API-Key", &self.credentials.client_id)
            .json(&serde_json::json!({
                "assetID": asset_id,
                "elementsToExtract": ["text"],
            }))
            .send()
            .await
            .map_err(|e| service_error(format!("job submission failed: {e}")))?;

        let response = ensure_success(response, "job submission").await?;
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| service_error("job submission response missing location header"))
    }

    async fn poll_until_done(&self, token: &str, job_url: &str) -> Result<String, Pdf2CardsError> {
        let poll = async {
            loop {
                let response = self
                    .client
                    .get(job_url)
                    .bearer_auth(token)
                    .header("X-API-Key", &self.credentials.client_id)
                    .send()
                    .await
                    .map_err(|e| service_error(format!("job poll failed: {e}")))?;
                let status: JobStatus = json_or_error(response, "job poll").await?;

                match status.status.as_str() {
                    "done" => {
                        return status
                            .content
                            .or(status.resource)
                            .map(|c| c.download_uri)
                            .ok_or_else(|| service_error("finished job has no download URI"));
                    }
                    "failed" => {
                        let detail = status
                            .error
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "job failed".to_string());
                        return Err(service_error(detail));
                    }
                    other => {
                        debug!("Extraction job status: {}", other);
                        tokio::time::sleep(self.poll_interval).await;
                    }
                }
            }
        };

        tokio::time::timeout(self.poll_timeout, poll)
            .await
            .map_err(|_| {
                service_error(format!(
                    "job did not finish within {:?}",
                    self.poll_timeout
                ))
            })?
    }

    async fn download(&self, uri: &str) -> Result<String, Pdf2CardsError> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| service_error(format!("result download failed: {e}")))?;
        let structured: StructuredData = json_or_error(response, "result download").await?;
        Ok(join_text_elements(&structured))
    }
}

#[async_trait]
impl TextExtractor for PdfServicesExtractor {
    fn name(&self) -> &str {
        SERVICE
    }

    #[tracing::instrument(skip(self, pdf), fields(bytes = pdf.len()))]
    async fn extract(&self, label: &str, pdf: &[u8]) -> Result<String, Pdf2CardsError> {
        let token = self.fetch_token().await?;
        let asset_id = self.upload(&token, pdf).await?;
        let job_url = self.submit(&token, &asset_id).await?;
        let download_uri = self.poll_until_done(&token, &job_url).await?;
        let text = self.download(&download_uri).await?;
        info!("{} returned {} chars for '{}'", SERVICE, text.len(), label);
        Ok(text)
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct AssetResponse {
    #[serde(rename = "uploadUri")]
    upload_uri: String,
    #[serde(rename = "assetID")]
    asset_id: String,
}

#[derive(Deserialize)]
struct JobStatus {
    status: String,
    content: Option<DownloadRef>,
    resource: Option<DownloadRef>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct DownloadRef {
    #[serde(rename = "downloadUri")]
    download_uri: String,
}

/// The structured-data document; only text elements matter here.
#[derive(Debug, Deserialize)]
pub struct StructuredData {
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "Text")]
    pub text: Option<String>,
}

/// Join every element's text with `"\n"`, skipping elements without text.
pub fn join_text_elements(data: &StructuredData) -> String {
    data.elements
        .iter()
        .filter_map(|e| e.text.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn service_error(detail: impl Into<String>) -> Pdf2CardsError {
    Pdf2CardsError::ExtractionService {
        service: SERVICE.to_string(),
        detail: detail.into(),
    }
}

async fn ensure_success(
    response: reqwest::Response,
    step: &str,
) -> Result<reqwest::Response, Pdf2CardsError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(service_error(format!("{step} returned {status}: {text}")))
}

async fn json_or_error<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    step: &str,
) -> Result<T, Pdf2CardsError> {
    ensure_success(response, step)
        .await?
        .json::<T>()
        .await
        .map_err(|e| service_error(format!("{step} response parse failed: {e}")))
}
