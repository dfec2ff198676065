// Defines the application error taxonomy and a result type alias using the thiserror crate.
use axum::extract::rejection::JsonRejection;
use thiserror::Error;

use crate::services::token::TokenError;

pub mod response;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("At least one field required to update")]
    NoFieldsProvided,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    // Duplicate registration; reported as 400 like any other rejected input.
    #[error("{0}")]
    Conflict(String),

    // Login failures (unknown email or wrong password)
    #[error("{0}")]
    Credentials(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),

    // The #[from] attribute automatically converts a redis::RedisError into an AppError::Redis using the From trait.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Custom result type
pub type AppResult<T> = Result<T, AppError>;
