use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Error kinds surfaced by the core (vector clock algebra has none; it is
/// total). Named per the error-kind catalogue, not as a grab bag of strings.
#[derive(Debug, Clone)]
pub enum AppError {
    NotFound(String),
    InvalidConfig(String),
    NoNodes,
    ReadQuorumUnmet { wanted: usize, got: usize },
    WriteQuorumUnmet { wanted: usize, got: usize },
    Unreachable(String),
    Protocol(String),
    NodeExists(String),
    NodeNotFound(String),
    HashingFailed(String),
    BadRequest(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "not found: {}", msg),
            AppError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            AppError::NoNodes => write!(f, "no nodes available"),
            AppError::ReadQuorumUnmet { wanted, got } => {
                write!(f, "read quorum unmet: wanted {}, got {}", wanted, got)
            }
            AppError::WriteQuorumUnmet { wanted, got } => {
                write!(f, "write quorum unmet: wanted {}, got {}", wanted, got)
            }
            AppError::Unreachable(msg) => write!(f, "unreachable: {}", msg),
            AppError::Protocol(msg) => write!(f, "protocol error: {}", msg),
            AppError::NodeExists(id) => write!(f, "node already exists: {}", id),
            AppError::NodeNotFound(id) => write!(f, "node not found: {}", id),
            AppError::HashingFailed(msg) => write!(f, "hashing failed: {}", msg),
            AppError::BadRequest(msg) => write!(f, "bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidConfig(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::NoNodes => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::ReadQuorumUnmet { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::WriteQuorumUnmet { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Unreachable(msg) => {
                tracing::warn!("replica unreachable: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Protocol(msg) => {
                tracing::warn!("protocol error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::NodeExists(id) => (StatusCode::BAD_REQUEST, format!("node exists: {}", id)),
            AppError::NodeNotFound(id) => {
                (StatusCode::BAD_REQUEST, format!("node not found: {}", id))
            }
            AppError::HashingFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            AppError::Unreachable(err.to_string())
        } else if err.is_decode() {
            AppError::Protocol(err.to_string())
        } else {
            AppError::Unreachable(err.to_string())
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
