use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::errors::AppError;
use crate::services::token::TokenError;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::NoFieldsProvided
            | AppError::InvalidRole(_)
            | AppError::Conflict(_)
            | AppError::Credentials(_)
            | AppError::Body(_) => StatusCode::BAD_REQUEST,

            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Token(TokenError::Issue(_) | TokenError::InvalidTtl(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Token(_) => StatusCode::UNAUTHORIZED,

            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            AppError::Redis(_)
            | AppError::Serialization(_)
            | AppError::PasswordHash(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// The IntoResponse trait implementation converts AppError into a JSON response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
            return (
                status,
                Json(json!({ "message": "Server error", "error": self.to_string() })),
            )
                .into_response();
        }

        tracing::debug!("Request rejected with {}: {}", status, self);
        let message = match &self {
            AppError::InvalidRole(_) => "Invalid role".to_string(),
            AppError::Token(_) => "Invalid or expired token".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
