use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use scandoc::{DatabaseError, ErrorKind, PipelineError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Document {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(PipelineError::InvalidFilename(_)) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(e) => match e.kind() {
                ErrorKind::MalformedInput | ErrorKind::UnsupportedImage => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ErrorKind::StorageFailure => StatusCode::BAD_GATEWAY,
                ErrorKind::PersistenceFailure => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Database(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiError::Pipeline(e) => Some(e.kind()),
            ApiError::Database(_) => Some(ErrorKind::PersistenceFailure),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}
