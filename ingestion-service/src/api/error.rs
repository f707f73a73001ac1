use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{pipeline::IngestionError, stores::StoreError};

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("malformed upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("{0}")]
    BadRequest(String),
}

fn internal(err: &dyn std::fmt::Display) -> Response {
    tracing::error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Internal server error: {err}"),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Ingestion(IngestionError::Store(e)) | ApiError::Store(e) => internal(&e),
            ApiError::Ingestion(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            ApiError::Multipart(e) => (e.status(), e.body_text()).into_response(),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
        }
    }
}
