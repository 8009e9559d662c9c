//! LLM interaction: send a prompt, collect the reply.
//!
//! The pipeline only needs one thing from a model: given a prompt, produce
//! the reply as a sequence of text fragments. [`CompletionSource`] is that
//! seam. [`ProviderCompletion`] implements it on top of any
//! `edgequake_llm` provider; tests implement it with canned fragments.
//!
//! [`aggregate`] drains the fragment stream in arrival order. There is no
//! retry here or anywhere else: a failed call fails the request.

use crate::config::CardConfig;
use crate::error::Pdf2CardsError;
use async_trait::async_trait;
use edgequake_llm::traits::StreamChunk;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::future;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tokio_stream::Stream;
use tracing::debug;

/// A boxed stream of reply fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, Pdf2CardsError>> + Send>>;

/// Anything that can answer a prompt with a stream of text fragments.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Short name for logs and stats.
    fn name(&self) -> &str;

    /// Start a completion for `prompt`.
    ///
    /// Errors returned here (auth, quota, network) happen before the first
    /// fragment; errors inside the stream happen mid-reply.
    async fn complete(&self, prompt: &str) -> Result<FragmentStream, Pdf2CardsError>;
}

/// Concatenate every fragment in arrival order.
///
/// Empty fragments add nothing. The stream is drained completely before
/// returning; the first fragment error aborts with that error.
pub async fn aggregate<S>(fragments: S) -> Result<String, Pdf2CardsError>
where
    S: Stream<Item = Result<String, Pdf2CardsError>>,
{
    let mut fragments = std::pin::pin!(fragments);
    let mut reply = String::new();
    let mut count = 0usize;
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        if !fragment.is_empty() {
            reply.push_str(&fragment);
        }
        count += 1;
    }
    debug!("Aggregated {} fragments into {} chars", count, reply.len());
    Ok(reply)
}

/// Run one prompt through `source` and return the full reply text.
///
/// `chunk` is only used to label errors. When `timeout_secs` is set, the
/// whole call (start + drain) must finish within it.
pub async fn complete_prompt(
    source: &dyn CompletionSource,
    prompt: &str,
    chunk: usize,
    timeout_secs: Option<u64>,
) -> Result<String, Pdf2CardsError> {
    let start = Instant::now();
    let call = async {
        let fragments = source.complete(prompt).await.map_err(|e| label_chunk(e, chunk))?;
        aggregate(fragments).await.map_err(|e| label_chunk(e, chunk))
    };

    let reply = match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
            .await
            .map_err(|_| Pdf2CardsError::CompletionTimeout { chunk, secs })??,
        None => call.await?,
    };

    debug!(
        "Chunk {}: {} prompt chars → {} reply chars in {:?} via {}",
        chunk,
        prompt.len(),
        reply.len(),
        start.elapsed(),
        source.name()
    );
    Ok(reply)
}

/// Attach the chunk index to completion failures raised without one.
fn label_chunk(err: Pdf2CardsError, chunk: usize) -> Pdf2CardsError {
    match err {
        Pdf2CardsError::CompletionFailed { detail, .. } => {
            Pdf2CardsError::CompletionFailed { chunk, detail }
        }
        other => other,
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// [`CompletionSource`] backed by an `edgequake_llm` provider.
///
/// Both paths send the configured temperature and token limit. With
/// `stream` enabled and a provider that can stream chat, content deltas
/// arrive as the model produces them. Otherwise a single chat call is made
/// and its reply is yielded as one fragment.
pub struct ProviderCompletion {
    provider: Arc<dyn LLMProvider>,
    stream: bool,
    options: CompletionOptions,
}

impl ProviderCompletion {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &CardConfig) -> Self {
        Self {
            provider,
            stream: config.stream,
            options: build_options(config),
        }
    }

    fn failed(e: impl std::fmt::Display) -> Pdf2CardsError {
        Pdf2CardsError::CompletionFailed {
            chunk: 0,
            detail: e.to_string(),
        }
    }
}

#[async_trait]
impl CompletionSource for ProviderCompletion {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn complete(&self, prompt: &str) -> Result<FragmentStream, Pdf2CardsError> {
        let messages = vec![ChatMessage::user(prompt)];

        if self.stream && self.provider.supports_tool_streaming() {
            let inner = self
                .provider
                .chat_with_tools_stream(&messages, &[], None, Some(&self.options))
                .await
                .map_err(Self::failed)?;
            let mapped = inner.filter_map(|item| {
                future::ready(match item {
                    Ok(StreamChunk::Content(text)) => Some(Ok(text)),
                    Ok(_) => None,
                    Err(e) => Some(Err(Self::failed(e))),
                })
            });
            return Ok(Box::pin(mapped));
        }

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(Self::failed)?;
        debug!(
            "{}: {} input tokens, {} output tokens",
            self.provider.name(),
            response.prompt_tokens,
            response.completion_tokens
        );
        Ok(Box::pin(stream::iter(vec![Ok(response.content)])))
    }
}

/// Build `CompletionOptions` from the card config.
fn build_options(config: &CardConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
