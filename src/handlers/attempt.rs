// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    error::AppError,
    models::attempt::{Attempt, AttemptResult, SubmitAttemptRequest},
    services::attempts,
    store::DynStore,
    utils::{extract::AppJson, jwt::Claims},
};

/// Submits answers for a quiz and returns the scored result.
///
/// Logic:
/// 1. The quiz must be visible to the caller and published (404 otherwise).
/// 2. The caller must have attempts left (403).
/// 3. Password-protected quizzes need the right password (401 missing, 403 wrong).
/// 4. Answers are scored and the attempt is stored.
pub async fn submit_attempt(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<SubmitAttemptRequest>,
) -> Result<Json<AttemptResult>, AppError> {
    let identity = claims.identity()?;
    let result = attempts::submit_attempt(store.as_ref(), &identity, payload).await?;
    Ok(Json(result))
}

/// The caller's own attempts on one quiz, newest first.
pub async fn list_my_attempts(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<Json<Vec<Attempt>>, AppError> {
    let identity = claims.identity()?;
    let attempts = attempts::list_my_attempts(store.as_ref(), &identity, quiz_id).await?;
    Ok(Json(attempts))
}
