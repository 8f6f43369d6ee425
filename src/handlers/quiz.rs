// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::RECENT_QUIZ_LIMIT,
    error::AppError,
    models::quiz::{CreateQuizRequest, QuizView, UpdateQuizRequest, VerifyPasswordRequest},
    services::quizzes,
    store::DynStore,
    utils::{extract::AppJson, jwt::Claims},
};

/// Lists the quizzes visible to the caller.
///
/// * Students: every published quiz.
/// * Admins: the quizzes they created, drafts included.
///
/// Each entry carries `attemptsMade` and `canAttempt` for the caller.
pub async fn list_quizzes(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<QuizView>>, AppError> {
    let identity = claims.identity()?;
    let quizzes = quizzes::list_visible(store.as_ref(), &identity, None).await?;
    Ok(Json(quizzes))
}

/// Same as `list_quizzes`, limited to the most recent few.
pub async fn recent_quizzes(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<QuizView>>, AppError> {
    let identity = claims.identity()?;
    let quizzes =
        quizzes::list_visible(store.as_ref(), &identity, Some(RECENT_QUIZ_LIMIT)).await?;
    Ok(Json(quizzes))
}

/// Fetches one quiz. Hidden and missing quizzes are both 404.
pub async fn get_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<QuizView>, AppError> {
    let identity = claims.identity()?;
    let quiz = quizzes::get_quiz(store.as_ref(), &identity, id).await?;
    Ok(Json(quiz))
}

/// Creates a new quiz owned by the calling admin.
/// Returns 201 Created with the full definition.
pub async fn create_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identity = claims.identity()?;
    let quiz = quizzes::create_quiz(store.as_ref(), &identity, payload).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Updates a quiz. Only fields present in the body change.
pub async fn update_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateQuizRequest>,
) -> Result<Json<QuizView>, AppError> {
    let identity = claims.identity()?;
    let quiz = quizzes::update_quiz(store.as_ref(), &identity, id, payload).await?;
    Ok(Json(quiz))
}

/// Deletes a quiz together with all of its attempts.
pub async fn delete_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let identity = claims.identity()?;
    quizzes::delete_quiz(store.as_ref(), &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pre-checks a quiz password before the caller starts an attempt.
pub async fn verify_password(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let identity = claims.identity()?;

    // The body is optional for quizzes without a password.
    let payload: VerifyPasswordRequest = if body.is_empty() {
        VerifyPasswordRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };

    quizzes::verify_password(store.as_ref(), &identity, id, payload.password.as_deref()).await?;

    Ok(Json(json!({ "success": true })))
}
