use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use scandoc::db::document_repo;
use scandoc::pipeline::{LogProgress, PipelineWarning};
use scandoc::{DocumentRow, StoredDocument, Submission};

use crate::error::ApiError;
use crate::state::AppState;

const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded and processed successfully";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub document_id: i64,
    pub public_url: String,
    pub extracted_text: String,
    pub warnings: Vec<PipelineWarning>,
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/api/upload", post(upload))
        .route("/api/documents", get(list_documents))
        .route("/api/documents/{id}", get(get_document))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Reads the `file` field of a multipart upload.
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("No selected file".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        return Ok((filename, bytes.to_vec()));
    }

    Err(ApiError::BadRequest("No file part".to_string()))
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let (filename, bytes) = read_file_field(&mut multipart).await?;
    tracing::info!(size = bytes.len(), "Received upload");

    let pipeline = state.pipeline.clone();
    let done = tokio::task::spawn_blocking(move || {
        pipeline.process(Submission::new(filename, bytes), &LogProgress)
    })
    .await??;

    Ok(Json(UploadResponse {
        message: UPLOAD_SUCCESS_MESSAGE,
        document_id: done.document_id,
        public_url: done.location,
        extracted_text: done.transcript,
        warnings: done.warnings,
    }))
}

async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentRow>>, ApiError> {
    let rows =
        tokio::task::spawn_blocking(move || document_repo::list_documents(state.db())).await??;
    Ok(Json(rows))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StoredDocument>, ApiError> {
    let found =
        tokio::task::spawn_blocking(move || document_repo::find_document(state.db(), id)).await??;
    found.map(Json).ok_or(ApiError::NotFound(id))
}
