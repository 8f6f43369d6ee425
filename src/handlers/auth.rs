// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{AuthResponse, LoginRequest, NewUser, RegisterRequest, User},
    store::DynStore,
    utils::{
        hash::{hash_password, verify_password},
        extract::AppJson,
        jwt::{Claims, sign_jwt},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with a bearer token and the user object (excluding password).
pub async fn register(
    State(store): State<DynStore>,
    State(config): State<Config>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let password_hash = hash_password(&payload.password)?;

    let user = store
        .create_user(NewUser {
            name: payload.name.trim().to_string(),
            email: normalize_email(&payload.email),
            password_hash,
            role: payload.role.unwrap_or_default(),
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    let token = sign_jwt(user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            token_type: "Bearer",
            user,
        }),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown emails and wrong passwords produce the same 401 so the endpoint
/// cannot be used to enumerate accounts.
pub async fn login(
    State(store): State<DynStore>,
    State(config): State<Config>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::AuthError("Invalid credentials".to_string());

    if payload.validate().is_err() {
        return Err(invalid());
    }

    let user = store
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        tracing::info!(user_id = user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    let token = sign_jwt(user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(AuthResponse {
        token,
        token_type: "Bearer",
        user,
    }))
}

/// Returns the authenticated caller's user record.
pub async fn me(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, AppError> {
    let identity = claims.identity()?;

    let user = store
        .find_user(identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
