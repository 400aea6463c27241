use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Caller supplied values the pricing engine cannot work with
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// No cost matrix with the requested name or type
    #[error("Cost matrix not found: {0}")]
    MatrixNotFound(String),
    /// A cache write was refused
    #[error("Cache write rejected: {0}")]
    CacheWrite(String),
    /// Internal server error
    #[error("Internal error: {0}")]
    InternalError(String),
    /// The origin could not be reached (connect failure, timeout, broken body)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::MatrixNotFound(_) => StatusCode::NOT_FOUND,
            Self::CacheWrite(_) => StatusCode::INSUFFICIENT_STORAGE,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Network(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::ConfigError(_) => "config_error",
        AppError::InvalidInput(_) => "invalid_input",
        AppError::MatrixNotFound(_) => "matrix_not_found",
        AppError::CacheWrite(_) => "cache_write_error",
        AppError::InternalError(_) => "internal_error",
        AppError::Network(_) => "network_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::MatrixNotFound("platinum".to_string());
        assert_eq!(error.to_string(), "Cost matrix not found: platinum");

        let error = AppError::InvalidInput("base_cost must be greater than zero".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid input: base_cost must be greater than zero"
        );
    }

    #[test]
    fn test_error_type_name() {
        assert_eq!(
            error_type_name(&AppError::InvalidInput("test".to_string())),
            "invalid_input"
        );
        assert_eq!(
            error_type_name(&AppError::CacheWrite("test".to_string())),
            "cache_write_error"
        );
    }

    #[tokio::test]
    async fn test_invalid_input_is_bad_request() {
        let error = AppError::InvalidInput("base_cost must be greater than zero".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_matrix_not_found_is_404() {
        let response = AppError::MatrixNotFound("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
