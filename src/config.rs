//! Configuration types for card generation.
//!
//! All behaviour is controlled through [`CardConfig`], built via its
//! [`CardConfigBuilder`]. Collaborators that talk to the outside world (the
//! LLM provider, the progress callback) can be injected here or resolved
//! from the environment at run time.

use crate::error::Pdf2CardsError;
use crate::progress::ProgressCallback;
use crate::schema::CardSchema;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for one card-generation run.
///
/// # Example
/// ```rust
/// use pdf2cards::{CardConfig, CardSchema};
///
/// let config = CardConfig::builder()
///     .schema(CardSchema::intro())
///     .chunk_width(20_000)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CardConfig {
    /// Keys the model must fill in. Default: [`CardSchema::hook`].
    pub schema: CardSchema,

    /// LLM model identifier, e.g. "gpt-4.1-nano". If None, uses the
    /// provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 1.0.
    ///
    /// The cards are meant to be lively prose, not a transcription, so the
    /// provider's neutral temperature is used.
    pub temperature: f32,

    /// Maximum tokens the model may generate per prompt. Default: 8000.
    pub max_tokens: usize,

    /// Request a streamed completion when the provider supports it. Default: true.
    ///
    /// Non-streaming providers (or `false` here) fall back to a single chat
    /// call whose reply is treated as a one-fragment stream.
    pub stream: bool,

    /// Cleaned-text length (in characters) above which the text is split
    /// into chunks. Default: 40 000.
    pub chunk_threshold: usize,

    /// Maximum characters per chunk. Default: 40 000.
    pub chunk_width: usize,

    /// Replacement prompt template. Must contain `{paper_text}`; `{fields}`
    /// is replaced with the enumerated schema keys.
    pub prompt_template: Option<String>,

    /// Which extraction backend [`crate::generate`] builds. Default: Pdfium.
    pub extractor: ExtractorBackend,

    /// PDF user password for encrypted documents (local extraction only).
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-prompt completion timeout in seconds. Default: None (wait until
    /// the provider finishes or errors).
    pub api_timeout_secs: Option<u64>,

    /// Upper bound on waiting for a cloud extraction job, in seconds.
    /// Default: 300.
    pub poll_timeout_secs: u64,

    /// Progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            schema: CardSchema::default(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 1.0,
            max_tokens: 8000,
            stream: true,
            chunk_threshold: 40_000,
            chunk_width: 40_000,
            prompt_template: None,
            extractor: ExtractorBackend::default(),
            password: None,
            download_timeout_secs: 120,
            api_timeout_secs: None,
            poll_timeout_secs: 300,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardConfig")
            .field("schema", &self.schema.keys().collect::<Vec<_>>())
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("stream", &self.stream)
            .field("chunk_threshold", &self.chunk_threshold)
            .field("chunk_width", &self.chunk_width)
            .field("prompt_template", &self.prompt_template.as_ref().map(|t| t.len()))
            .field("extractor", &self.extractor)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

impl CardConfig {
    /// Create a new builder for `CardConfig`.
    pub fn builder() -> CardConfigBuilder {
        CardConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CardConfig`].
#[derive(Debug)]
pub struct CardConfigBuilder {
    config: CardConfig,
}

impl CardConfigBuilder {
    pub fn schema(mut self, schema: CardSchema) -> Self {
        self.config.schema = schema;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn stream(mut self, v: bool) -> Self {
        self.config.stream = v;
        self
    }

    pub fn chunk_threshold(mut self, chars: usize) -> Self {
        self.config.chunk_threshold = chars;
        self
    }

    pub fn chunk_width(mut self, chars: usize) -> Self {
        self.config.chunk_width = chars;
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn extractor(mut self, backend: ExtractorBackend) -> Self {
        self.config.extractor = backend;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.config.poll_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CardConfig, Pdf2CardsError> {
        let c = &self.config;
        if c.schema.is_empty() {
            return Err(Pdf2CardsError::InvalidConfig(
                "Card schema must contain at least one field".into(),
            ));
        }
        if c.chunk_width == 0 {
            return Err(Pdf2CardsError::InvalidConfig(
                "Chunk width must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Pdf2CardsError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if let Some(ref t) = c.prompt_template {
            if !t.contains(crate::prompts::PAPER_TEXT_PLACEHOLDER) {
                return Err(Pdf2CardsError::InvalidConfig(format!(
                    "Prompt template must contain {}",
                    crate::prompts::PAPER_TEXT_PLACEHOLDER
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which PDF text-extraction strategy to use.
///
/// | Backend | Where | Needs |
/// |---------|-------|-------|
/// | `Pdfium` | in-process | a pdfium shared library |
/// | `PdfServices` | cloud | `PDF_SERVICES_CLIENT_ID` / `PDF_SERVICES_CLIENT_SECRET` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractorBackend {
    /// Local parsing with pdfium. (default)
    #[default]
    Pdfium,
    /// Remote document-conversion service.
    PdfServices,
}
