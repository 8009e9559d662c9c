//! HTTP front end (axum).
//!
//! | Route | Body | Success |
//! |-------|------|---------|
//! | `POST /cards` | multipart: a `file` part (`application/pdf`) **or** a `url` part | `200` + card JSON |
//! | `POST /cards/url` | JSON `{"url": "..."}` | `200` + card JSON |
//! | `GET /health` | none | `200` + `{"status":"ok"}` |
//!
//! Every failure has the same body shape:
//!
//! ```json
//! {"message": "Failed to generate cards", "kind": "input", "error": "..."}
//! ```
//!
//! The status code is derived from [`Pdf2CardsError::kind`] by
//! [`status_for`], the only place that mapping lives.

use crate::config::CardConfig;
use crate::convert::generate_cards;
use crate::error::{ErrorKind, Pdf2CardsError};
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::input::DocumentSource;
use crate::pipeline::llm::CompletionSource;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const FAILURE_MESSAGE: &str = "Failed to generate cards";

/// Collaborators shared by every request. Nothing here is mutated.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<dyn TextExtractor>,
    pub completion: Arc<dyn CompletionSource>,
    pub config: Arc<CardConfig>,
}

impl AppState {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        completion: Arc<dyn CompletionSource>,
        config: CardConfig,
    ) -> Self {
        Self {
            extractor,
            completion,
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route("/cards", post(cards_upload_handler))
        .route("/cards/url", post(cards_url_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), Pdf2CardsError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Pdf2CardsError::Internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("pdf2cards server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("pdf2cards server shutting down");
        })
        .await
        .map_err(|e| Pdf2CardsError::Internal(format!("Server error: {e}")))
}

// ── Error mapping ────────────────────────────────────────────────────────

/// HTTP status for a pipeline error.
pub fn status_for(err: &Pdf2CardsError) -> StatusCode {
    if matches!(err, Pdf2CardsError::NotAPdf { .. }) {
        return StatusCode::UNSUPPORTED_MEDIA_TYPE;
    }
    match err.kind() {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::Extraction => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Completion
        | ErrorKind::NoJsonStructureFound
        | ErrorKind::UnrecoverableJson => StatusCode::BAD_GATEWAY,
        ErrorKind::Config | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub kind: ErrorKind,
    pub error: String,
}

/// A pipeline error on its way out as an HTTP response.
pub struct ApiError(pub Pdf2CardsError);

impl From<Pdf2CardsError> for ApiError {
    fn from(e: Pdf2CardsError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Card generation failed");
        } else {
            tracing::warn!(error = %self.0, "Card generation rejected");
        }
        let body = ErrorBody {
            message: FAILURE_MESSAGE.to_string(),
            kind: self.0.kind(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[tracing::instrument(skip(state, multipart))]
async fn cards_upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload = None;
    let mut url = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError(Pdf2CardsError::InvalidInput {
            input: format!("multipart body: {e}"),
        })
    })? {
        match field.name() {
            Some("file") => {
                let content_type = field.content_type().map(str::to_string);
                let filename = field.file_name().map(str::to_string);
                tracing::debug!(?filename, ?content_type, "Processing file upload");
                // Reject before buffering the body.
                if let Some(ref ct) = content_type {
                    crate::pipeline::input::check_content_type(ct)?;
                }
                let data = field.bytes().await.map_err(|e| {
                    ApiError(Pdf2CardsError::InvalidInput {
                        input: format!("file part: {e}"),
                    })
                })?;
                upload = Some((data.to_vec(), content_type, filename));
            }
            Some("url") => {
                let text = field.text().await.map_err(|e| {
                    ApiError(Pdf2CardsError::InvalidInput {
                        input: format!("url part: {e}"),
                    })
                })?;
                url = Some(text);
            }
            other => tracing::debug!(field = ?other, "Ignoring unknown multipart field"),
        }
    }

    let source = DocumentSource::from_parts(upload, url)?;
    run(&state, source).await
}

#[derive(Debug, Deserialize)]
struct UrlRequest {
    url: String,
}

#[tracing::instrument(skip(state, request))]
async fn cards_url_handler(
    State(state): State<AppState>,
    Json(request): Json<UrlRequest>,
) -> Result<Response, ApiError> {
    let source = DocumentSource::from_parts(None, Some(request.url))?;
    run(&state, source).await
}

async fn run(state: &AppState, source: DocumentSource) -> Result<Response, ApiError> {
    let output = generate_cards(
        source,
        state.extractor.as_ref(),
        state.completion.as_ref(),
        &state.config,
    )
    .await?;
    Ok(Json(output.cards).into_response())
}
