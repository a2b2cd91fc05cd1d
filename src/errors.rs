use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::repositories::RepositoryError;

/// Failure taxonomy of the whole API surface. Every failing request maps to
/// exactly one variant, and every variant to one status code.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No credential, or not `Bearer <token>`.
    #[error("authentication required.")]
    Unauthenticated,

    /// Credential present but unverifiable, or insufficient role.
    #[error("{0}")]
    Forbidden(String),

    /// Missing/malformed required field, invalid enum value.
    #[error("{0}")]
    InvalidArgument(String),

    /// Referenced document absent, or an update matched zero documents.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique key.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected store/verifier failure. The source is logged, never sent.
    #[error("internal server error.")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            tracing::error!(error = ?e, "request failed");
        }

        let body = Json(json!({ "message": self.to_string() }));

        (self.status(), body).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ApiError::NotFound("cannot find object.".to_owned()),
            RepositoryError::NoUnique { .. } => {
                ApiError::Internal(anyhow::anyhow!("expected unique object: {}", e))
            }
            RepositoryError::Internal(e) => ApiError::Internal(e),
        }
    }
}
