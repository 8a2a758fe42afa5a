use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Access token error: {0}")]
    AuthError(String),

    #[error("Weather API error: {0}")]
    WeatherError(String),

    #[error("Failed to fetch warnings: {0}")]
    WarningFetchError(String),

    #[error("Template message send failed: {0}")]
    SendError(String),

    #[error("Failed to forward message: {0}")]
    ForwardError(String),

    #[error("Failed to fetch data: {0}")]
    FetchError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::ConfigError(_) | AppError::AuthError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::FetchError(_) | AppError::ForwardError(_) => StatusCode::BAD_GATEWAY,
            AppError::WeatherError(_)
            | AppError::WarningFetchError(_)
            | AppError::SendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::FetchError(err.to_string())
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_maps_to_internal_server_error() {
        let response = AppError::AuthError("no token".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_env_var_becomes_config_error() {
        let err: AppError = std::env::VarError::NotPresent.into();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
