use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use potato_custody::{CustodyError, Rejection};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Custody(#[from] CustodyError),

    #[error("invalid request body: {0}")]
    InvalidRequest(#[from] JsonRejection),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Custody(err) => match err {
                CustodyError::InvalidActor { .. } => StatusCode::BAD_REQUEST,
                CustodyError::Rejected(Rejection::NotFound { .. }) => StatusCode::NOT_FOUND,
                CustodyError::Rejected(Rejection::NotHolder { .. }) => StatusCode::CONFLICT,
                CustodyError::Rejected(_) => StatusCode::BAD_REQUEST,
                CustodyError::StorageCorrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CustodyError::StorageIo(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Custody(err) => err.code(),
            Self::InvalidRequest(_) => "invalid_request",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (status, body).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
