// src/handlers/stats.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    error::AppError,
    models::stats::{DashboardStats, QuizAnalytics},
    services::analytics,
    store::DynStore,
    utils::jwt::Claims,
};

/// Dashboard counters.
///
/// * Admins: totals over the quizzes they own.
/// * Students: published quiz count and their own attempt history.
pub async fn dashboard(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DashboardStats>, AppError> {
    let identity = claims.identity()?;
    let stats = analytics::dashboard(store.as_ref(), &identity).await?;
    Ok(Json(stats))
}

/// Per-quiz analytics for the owning admin.
pub async fn quiz_analytics(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<Json<QuizAnalytics>, AppError> {
    let identity = claims.identity()?;
    let view = analytics::quiz_analytics(store.as_ref(), &identity, quiz_id).await?;
    Ok(Json(view))
}
