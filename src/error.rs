use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    guard::SessionError, hcen::HcenError, repository::RepositoryError, storage::StorageError,
};

/// FieldError
///
/// One failed validation rule, keyed by the wire name of the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// ApiError
///
/// The single error type returned by handlers. Each variant maps to one HTTP
/// status and renders as `{ "error": "...", "fields": [...] }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Upstream(String),

    #[error("internal server error")]
    Internal,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ApiError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();
        let fields = match self {
            ApiError::Validation(fields) => fields,
            _ => Vec::new(),
        };
        (status, Json(ErrorBody { error, fields })).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => ApiError::Conflict(message),
            RepositoryError::Database(e) => {
                tracing::error!("repository failure: {:?}", e);
                ApiError::Internal
            }
        }
    }
}

impl From<HcenError> for ApiError {
    fn from(err: HcenError) -> Self {
        tracing::error!("HCEN request failed: {}", err);
        match err {
            HcenError::Status { status: 404, message } => ApiError::NotFound(message),
            HcenError::Status { message, .. } => ApiError::Upstream(message),
            HcenError::Transport(_) | HcenError::Decode(_) => {
                ApiError::Upstream("could not reach the clinical records service".to_string())
            }
            HcenError::InvalidInput(message) => ApiError::BadRequest(message),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!("storage failure: {}", err);
        ApiError::Internal
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        tracing::error!("rejected session: {}", err);
        ApiError::Forbidden(err.to_string())
    }
}
