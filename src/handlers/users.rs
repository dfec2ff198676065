use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::models::{normalize_email, LoginForm, ProfileForm, RegisterForm, User, UserProfile};
use crate::services::{Identity, PasswordHasher, TokenService, UserStore};

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

pub async fn register(
    State(users): State<Arc<dyn UserStore>>,
    State(passwords): State<PasswordHasher>,
    payload: Result<Json<RegisterForm>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(form) = payload?;
    form.validate()?;

    let email = normalize_email(&form.email);
    tracing::info!("Registration attempt for {}", email);

    if users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = passwords.hash(form.password).await?;
    // The store re-checks uniqueness, covering a concurrent registration.
    let user = users
        .create_user(User::new(form.username, email, password_hash))
        .await?;

    tracing::info!("Registered user {}", user.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

pub async fn login(
    State(users): State<Arc<dyn UserStore>>,
    State(passwords): State<PasswordHasher>,
    State(tokens): State<Arc<TokenService>>,
    payload: Result<Json<LoginForm>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(form) = payload?;
    form.validate()?;

    let email = normalize_email(&form.email);
    let user = users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Credentials("User not registered".into()))?;

    if !passwords
        .verify(form.password, user.password_hash.clone())
        .await?
    {
        tracing::info!("Invalid password for user {}", user.id);
        return Err(AppError::Credentials("Invalid credentials".into()));
    }

    let token = tokens.issue(user.id, user.role)?;
    tracing::info!("User {} logged in", user.id);

    Ok(Json(json!({
        "token": token,
        "user": {
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "role": user.role,
        },
    })))
}

pub async fn current_user(
    State(users): State<Arc<dyn UserStore>>,
    identity: Identity,
) -> AppResult<Json<UserProfile>> {
    let user = users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(UserProfile::from(&user)))
}

pub async fn update_profile(
    State(users): State<Arc<dyn UserStore>>,
    identity: Identity,
    payload: Result<Json<ProfileForm>, JsonRejection>,
) -> AppResult<Json<UserProfile>> {
    let Json(form) = payload?;
    form.validate()?;

    let user = users
        .update_username(identity.user_id, &form.username)
        .await?
        .ok_or_else(user_not_found)?;
    tracing::debug!("User {} renamed to {}", user.id, user.username);
    Ok(Json(UserProfile::from(&user)))
}
