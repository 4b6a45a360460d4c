use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use service::StatusError;
use tracing::{error, warn};

/// JSON error response: `{"error": ..., "details": ...}` (`details` only for store faults).
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self { status, error: error.into(), details }
    }

    pub fn invalid_source() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid source.", None)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed", None)
    }
}

impl From<StatusError> for JsonApiError {
    fn from(err: StatusError) -> Self {
        let details = err.details();
        match err {
            StatusError::InvalidSource(source) => {
                warn!(%source, "rejected update for unknown source");
                Self::invalid_source()
            }
            StatusError::StoreRead(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "KV read error", Some(details))
            }
            StatusError::StoreWrite(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "KV write error", Some(details))
            }
        }
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.error, details = self.details.as_deref().unwrap_or(""), "request failed");
        }
        let body = ErrorBody { error: &self.error, details: self.details.as_deref() };
        (self.status, Json(body)).into_response()
    }
}
