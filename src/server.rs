//! JSON/multipart HTTP API — the surface an interactive front end calls.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/documents` | Upload a file (multipart field `file`) and ingest it |
//! | `GET` | `/documents` | List stored documents, newest first |
//! | `GET` | `/documents/{id}` | One document's metadata record |
//! | `GET` | `/documents/{id}/chunks` | A document's chunks in index order |
//! | `DELETE` | `/documents/{id}` | Delete a document and its chunks |
//! | `POST` | `/query` | Ask a question (`document_id` scopes it to one document) |
//! | `GET` | `/health` | Health check (returns version) |
//!
//! # Error contract
//!
//! Failures are returned as `{ "error": { "code": …, "message": … } }`:
//! `not_found` (404), `empty_document` (422), `load_failed` (422),
//! `unsupported_format` (415), `connection_unavailable` (503),
//! `storage_failure` (500), `bad_request` (400).
//!
//! Uploads spool to a named temp file carrying the original extension so
//! the loader can dispatch on it; the file is deleted on every exit path.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! front ends.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::Error;
use crate::ingest::ingest_file;
use crate::query::QueryService;
use crate::store::DocumentStore;

/// Upload size cap.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn DocumentStore>,
    query: Arc<QueryService>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

/// Start the HTTP server on the configured bind address.
///
/// All dependencies are constructed by the caller and injected here; the
/// server holds them for its lifetime and never re-initializes them.
pub async fn run_server(
    config: &Config,
    store: Arc<dyn DocumentStore>,
    query: Arc<QueryService>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
) -> anyhow::Result<()> {
    let state = AppState {
        store,
        query,
        embedder,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/documents", post(handle_upload).get(handle_list))
        .route("/documents/{id}", get(handle_get).delete(handle_delete))
        .route("/documents/{id}/chunks", get(handle_chunks))
        .route("/query", post(handle_query))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state);

    println!("askdocs server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error body with a machine-readable code and human message.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({ "error": { "code": self.code, "message": self.message } });
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::EmptyDocument => (StatusCode::UNPROCESSABLE_ENTITY, "empty_document"),
            Error::Loader { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "load_failed"),
            Error::UnsupportedFormat(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format")
            }
            Error::ConnectionUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "connection_unavailable")
            }
            Error::StorageFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_failure"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ Handlers ============

async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let file_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string()
            });
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.to_string()))?;

        // Spool to a temp file carrying the original extension so the
        // loader can dispatch on it; dropped (deleted) on every exit path.
        let suffix = std::path::Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let tmp = tempfile::Builder::new()
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "storage_failure",
                message: e.to_string(),
            })?;
        std::fs::write(tmp.path(), &bytes).map_err(|e| AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "storage_failure",
            message: e.to_string(),
        })?;

        let id = ingest_file(
            state.store.as_ref(),
            state.embedder.as_deref(),
            tmp.path(),
            &filename,
            &file_type,
            bytes.len() as i64,
        )
        .await?;

        return Ok((
            StatusCode::CREATED,
            Json(json!({ "id": id, "filename": filename })),
        ));
    }

    Err(bad_request("multipart field 'file' is required"))
}

async fn handle_list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let documents = state.store.list_documents().await?;
    Ok(Json(documents))
}

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    match state.store.get_document(id).await? {
        Some(document) => Ok(Json(document)),
        None => Err(Error::NotFound(format!("document {}", id)).into()),
    }
}

async fn handle_chunks(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if state.store.get_document(id).await?.is_none() {
        return Err(Error::NotFound(format!("document {}", id)).into());
    }
    let chunks = state.store.get_chunks(id).await?;
    Ok(Json(chunks))
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.store.delete_document(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    document_id: Option<i64>,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let answer = match request.document_id {
        Some(id) => {
            state
                .query
                .ask_document(state.store.as_ref(), id, &request.query)
                .await?
        }
        None => state.query.ask_all(state.store.as_ref(), &request.query).await?,
    };

    Ok(Json(json!({
        "answer": answer,
        "document_id": request.document_id,
    })))
}
