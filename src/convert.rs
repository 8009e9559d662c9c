//! Card-generation entry points.
//!
//! [`generate_cards`] is the pipeline proper: it takes its collaborators
//! explicitly, which is what the HTTP server and the tests use.
//! [`generate`] resolves the collaborators from the config and environment
//! first, which is what the CLI and most library callers want.

use crate::config::CardConfig;
use crate::error::Pdf2CardsError;
use crate::output::{CardOutput, CardSummary, ChunkResult, GenerationStats};
use crate::pipeline::extract::{extractor_from_config, TextExtractor};
use crate::pipeline::input::{self, DocumentSource};
use crate::pipeline::llm::{self, CompletionSource, ProviderCompletion};
use crate::pipeline::{chunk, normalize, recover};
use crate::progress::{CardProgressCallback, NoopProgressCallback};
use crate::prompts;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Generate cards for one document with explicit collaborators.
///
/// Steps, each aborting the run on error:
///
/// 1. validate `source` and load its bytes
/// 2. extract raw text with `extractor`
/// 3. normalise it
/// 4. if the cleaned text is longer than `config.chunk_threshold`
///    characters, split it into `config.chunk_width` chunks and run
///    prompt → completion → recovery on each in order, then combine;
///    otherwise run prompt → completion → recovery once
///
/// # Errors
/// The first error of any stage, unchanged. There are no retries and no
/// partial results: one failed chunk fails the whole run.
pub async fn generate_cards(
    source: DocumentSource,
    extractor: &dyn TextExtractor,
    completion: &dyn CompletionSource,
    config: &CardConfig,
) -> Result<CardOutput, Pdf2CardsError> {
    let total_start = Instant::now();
    let noop: Arc<dyn CardProgressCallback> = Arc::new(NoopProgressCallback);
    let progress = config.progress_callback.as_ref().unwrap_or(&noop);
    info!("Starting card generation: {}", source.display_name());

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let payload = input::resolve_source(source, config.download_timeout_secs).await?;

    // ── Step 2: Extract ──────────────────────────────────────────────────
    let extract_start = Instant::now();
    let raw = extractor.extract(&payload.name, &payload.bytes).await?;
    let extraction_ms = extract_start.elapsed().as_millis() as u64;
    let raw_chars = raw.chars().count();
    info!(
        "Extracted {} chars from '{}' with {} in {}ms",
        raw_chars,
        payload.name,
        extractor.name(),
        extraction_ms
    );
    progress.on_extraction_complete(raw_chars);

    // ── Step 3: Normalize ────────────────────────────────────────────────
    let cleaned = normalize::normalize(&raw);
    let cleaned_chars = cleaned.chars().count();
    if cleaned_chars == 0 {
        return Err(Pdf2CardsError::EmptyDocument { name: payload.name });
    }
    debug!("Normalized {} → {} chars", raw_chars, cleaned_chars);

    // ── Step 4: Chunk ────────────────────────────────────────────────────
    let chunks = if cleaned_chars > config.chunk_threshold {
        let chunks = chunk::split(&cleaned, config.chunk_width);
        info!(
            "Text exceeds {} chars; split into {} chunks of ≤{}",
            config.chunk_threshold,
            chunks.len(),
            config.chunk_width
        );
        chunks
    } else {
        vec![chunk::TextChunk {
            index: 0,
            text: cleaned,
        }]
    };

    // ── Step 5: Complete and recover, one chunk at a time ────────────────
    let total = chunks.len();
    progress.on_generation_start(total);
    let completion_start = Instant::now();
    let mut partials = Vec::with_capacity(total);
    let mut chunk_results = Vec::with_capacity(total);

    for piece in &chunks {
        progress.on_chunk_start(piece.index, total);
        match process_chunk(piece, completion, config).await {
            Ok((card, result)) => {
                progress.on_chunk_complete(piece.index, total, result.response_chars);
                partials.push(card);
                chunk_results.push(result);
            }
            Err(e) => {
                warn!("Chunk {}/{} failed: {}", piece.index + 1, total, e);
                progress.on_chunk_error(piece.index, total, e.to_string());
                return Err(e);
            }
        }
    }
    let completion_ms = completion_start.elapsed().as_millis() as u64;

    // ── Step 6: Combine ──────────────────────────────────────────────────
    let cards = match partials.len() {
        1 => partials.remove(0),
        _ => chunk::combine(&config.schema, &partials),
    };
    progress.on_generation_complete(total);

    let stats = GenerationStats {
        extractor: extractor.name().to_string(),
        raw_chars,
        cleaned_chars,
        chunk_count: total,
        extraction_ms,
        completion_ms,
        total_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Generated {} cards from {} chunk(s) in {}ms",
        cards.len(),
        stats.chunk_count,
        stats.total_ms
    );

    Ok(CardOutput {
        cards,
        chunks: chunk_results,
        stats,
    })
}

/// Render, complete and recover a single chunk.
async fn process_chunk(
    piece: &chunk::TextChunk,
    completion: &dyn CompletionSource,
    config: &CardConfig,
) -> Result<(CardSummary, ChunkResult), Pdf2CardsError> {
    let start = Instant::now();
    let prompt = match config.prompt_template {
        Some(ref template) => prompts::render_with_template(template, &piece.text, &config.schema),
        None => prompts::render_prompt(&piece.text, &config.schema),
    };

    let response =
        llm::complete_prompt(completion, &prompt, piece.index, config.api_timeout_secs).await?;
    let card = recover::recover_card(&response, &config.schema)?;

    Ok((
        card,
        ChunkResult {
            index: piece.index,
            chars: piece.char_len(),
            response_chars: response.chars().count(),
            duration_ms: start.elapsed().as_millis() as u64,
        },
    ))
}

/// Generate cards, resolving the extractor and LLM provider from `config`
/// and the environment.
///
/// # Example
/// ```rust,no_run
/// use pdf2cards::{generate, CardConfig, DocumentSource};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CardConfig::default();
/// let source = DocumentSource::from_input("paper.pdf")?;
/// let output = generate(source, &config).await?;
/// println!("{}", output.cards.to_pretty_json());
/// # Ok(())
/// # }
/// ```
pub async fn generate(
    source: DocumentSource,
    config: &CardConfig,
) -> Result<CardOutput, Pdf2CardsError> {
    // Cheap rejections first, so a bad upload never needs credentials.
    source.validate()?;
    let extractor = extractor_from_config(config)?;
    let completion = completion_from_config(config).await?;
    generate_cards(source, extractor.as_ref(), completion.as_ref(), config).await
}

/// Generate cards and write the pretty-printed summary JSON to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_to_file(
    source: DocumentSource,
    output_path: impl AsRef<Path>,
    config: &CardConfig,
) -> Result<GenerationStats, Pdf2CardsError> {
    let output = generate(source, config).await?;
    write_atomic(output_path.as_ref(), &output.cards.to_pretty_json()).await?;
    Ok(output.stats)
}

/// Write `contents` to `path` via a sibling temp file.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), Pdf2CardsError> {
    let write_err = |e| Pdf2CardsError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    source: DocumentSource,
    config: &CardConfig,
) -> Result<CardOutput, Pdf2CardsError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2CardsError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(source, config))
}

/// Build the [`CompletionSource`] for `config` from its resolved provider.
pub async fn completion_from_config(
    config: &CardConfig,
) -> Result<Arc<dyn CompletionSource>, Pdf2CardsError> {
    let provider = resolve_provider(config).await?;
    info!("Using LLM provider: {}", provider.name());
    Ok(Arc::new(ProviderCompletion::new(provider, config)))
}

// ── Internal helpers ─────────────────────────────────────────────────────

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, Pdf2CardsError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2CardsError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`). The factory reads
///    the matching API key (`OPENAI_API_KEY`, `GROQ_API_KEY`, …).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **`OPENAI_API_KEY`** present → OpenAI with the configured model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
async fn resolve_provider(config: &CardConfig) -> Result<Arc<dyn LLMProvider>, Pdf2CardsError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2CardsError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomic_creates_parent_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cards.json");
        write_atomic(&path, "{}").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn generate_rejects_non_pdf_before_resolving_collaborators() {
        // PdfServices would fail on missing credentials; validation comes first.
        let config = CardConfig::builder()
            .extractor(crate::config::ExtractorBackend::PdfServices)
            .build()
            .unwrap();
        let source = DocumentSource::Bytes {
            data: b"hello".to_vec(),
            content_type: Some("text/plain".into()),
            filename: None,
        };
        let err = generate(source, &config).await.unwrap_err();
        assert!(matches!(err, Pdf2CardsError::NotAPdf { .. }));
    }
}
