use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use stacks_gate::GateError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Malformed or unverifiable request
    #[error("{0}")]
    BadRequest(String),

    /// Resource generator failed or was unreachable
    #[error("resource generation failed: {0}")]
    Generation(String),

    /// Ledger, decoding, or other internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GateError> for ServerError {
    fn from(e: GateError) -> Self {
        match e {
            e if e.is_request_error() => ServerError::BadRequest(e.to_string()),
            GateError::GeneratorError(msg) => ServerError::Generation(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Generation(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServerError::BadRequest(msg) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": msg }))
            }
            ServerError::Generation(msg) => {
                tracing::error!("Resource generation failed: {}", msg);
                HttpResponse::InternalServerError()
                    .content_type("text/plain; charset=utf-8")
                    .body("resource generation failed")
            }
            ServerError::Internal(msg) => {
                // Details stay in the logs
                tracing::error!("Internal error: {}", msg);
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({ "error": "internal error" }))
            }
        }
    }
}
