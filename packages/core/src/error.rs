use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analytics::error::ProviderError;

/// Unified application error.
///
/// This ensures all layers (config, network, parsing, storage)
/// fail in a predictable and debuggable way.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::FormatError { message } => AppError::Parse(message),
            ProviderError::AuthError { message } => {
                AppError::Config(format!("Reddit authentication failed: {}", message))
            }
            other => AppError::Network(other.to_string()),
        }
    }
}

impl From<prometheus::Error> for AppError {
    fn from(err: prometheus::Error) -> Self {
        AppError::Config(format!("Metrics registry: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) => StatusCode::BAD_REQUEST,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Parse(_) | AppError::Io(_) | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_to_app_errors() {
        assert!(matches!(
            AppError::from(ProviderError::format("bad json")),
            AppError::Parse(msg) if msg == "bad json"
        ));
        assert!(matches!(
            AppError::from(ProviderError::ServiceUnavailable),
            AppError::Network(_)
        ));
        assert!(matches!(
            AppError::from(ProviderError::auth("invalid_grant")),
            AppError::Config(msg) if msg.contains("invalid_grant")
        ));
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = AppError::NotFound("no report".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn display_prefixes_category() {
        assert_eq!(AppError::Config("x".into()).to_string(), "Config error: x");
    }
}
