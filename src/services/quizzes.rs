// src/services/quizzes.rs

//! Quiz catalog: listing, fetching and owner-only mutations.

use validator::Validate;

use crate::{
    error::AppError,
    models::{
        quiz::{
            CreateQuizRequest, DEFAULT_TIME_LIMIT, NewQuiz, PasswordChange, QuizChanges, QuizView,
            UpdateQuizRequest, build_questions, normalize_attempts_allowed, normalize_flag,
        },
        user::Identity,
    },
    services::access,
    store::QuizStore,
    utils::hash::hash_password,
};

/// Quizzes visible to `identity`, newest first, annotated with the caller's
/// attempt counts. `limit` caps the number returned.
pub async fn list_visible(
    store: &dyn QuizStore,
    identity: &Identity,
    limit: Option<i64>,
) -> Result<Vec<QuizView>, AppError> {
    let quizzes = store
        .list_quizzes(access::visibility_filter(identity), limit)
        .await?;
    let counts = store.attempt_counts_for_user(identity.id).await?;

    Ok(quizzes
        .iter()
        .map(|quiz| {
            let made = counts.get(&quiz.id).copied().unwrap_or(0);
            QuizView::for_viewer(quiz, identity, made)
        })
        .collect())
}

pub async fn get_quiz(
    store: &dyn QuizStore,
    identity: &Identity,
    id: i64,
) -> Result<QuizView, AppError> {
    let quiz = access::ensure_visible(store.find_quiz(id).await?, identity)?;
    let made = store.count_attempts(identity.id, quiz.id).await?;
    Ok(QuizView::for_viewer(&quiz, identity, made))
}

/// Creates a quiz owned by `identity`, which must be an admin.
pub async fn create_quiz(
    store: &dyn QuizStore,
    identity: &Identity,
    req: CreateQuizRequest,
) -> Result<QuizView, AppError> {
    if !identity.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    // 1. Validate
    req.validate()?;
    let title = normalize_title(&req.title)?;
    let questions = build_questions(req.questions)?;

    // 2. Normalize loosely-typed settings
    let attempts_allowed = normalize_attempts_allowed(req.attempts_allowed.as_ref());
    let allow_previous = normalize_flag(req.allow_previous.as_ref(), true);
    let time_limit = req
        .time_limit
        .and_then(|t| i32::try_from(t).ok())
        .unwrap_or(DEFAULT_TIME_LIMIT);

    // 3. Hash the quiz password, if any
    let password_hash = match req.quiz_password.as_deref().filter(|p| !p.is_empty()) {
        Some(plain) => Some(hash_password(plain)?),
        None => None,
    };

    let quiz = store
        .insert_quiz(NewQuiz {
            title,
            description: req.description.unwrap_or_default(),
            category: req.category.unwrap_or_default(),
            time_limit,
            is_published: req.is_published.unwrap_or(false),
            attempts_allowed,
            allow_previous,
            password_hash,
            created_by: identity.id,
            questions,
        })
        .await?;

    tracing::info!(quiz_id = quiz.id, owner_id = identity.id, "Quiz created");
    Ok(QuizView::full(&quiz))
}

/// Applies a partial update. Only the owning admin may do so.
pub async fn update_quiz(
    store: &dyn QuizStore,
    identity: &Identity,
    id: i64,
    req: UpdateQuizRequest,
) -> Result<QuizView, AppError> {
    let quiz = store
        .find_quiz(id)
        .await?
        .ok_or_else(AppError::quiz_not_found)?;
    access::ensure_owner(&quiz, identity)?;

    req.validate()?;
    let changes = QuizChanges {
        title: req.title.as_deref().map(normalize_title).transpose()?,
        description: req.description,
        category: req.category,
        time_limit: req.time_limit.and_then(|t| i32::try_from(t).ok()),
        is_published: req.is_published,
        attempts_allowed: req
            .attempts_allowed
            .as_ref()
            .map(|v| normalize_attempts_allowed(Some(v))),
        allow_previous: req
            .allow_previous
            .as_ref()
            .map(|v| normalize_flag(Some(v), true)),
        password: match req.quiz_password.as_deref() {
            None => PasswordChange::Keep,
            Some("") => PasswordChange::Clear,
            Some(plain) => PasswordChange::Set(hash_password(plain)?),
        },
        questions: req.questions.map(build_questions).transpose()?,
    };

    let updated = store
        .update_quiz(quiz.id, changes)
        .await?
        .ok_or_else(AppError::quiz_not_found)?;

    tracing::info!(quiz_id = updated.id, owner_id = identity.id, "Quiz updated");
    Ok(QuizView::full(&updated))
}

/// Deletes a quiz and its attempts. Only the owning admin may do so.
pub async fn delete_quiz(store: &dyn QuizStore, identity: &Identity, id: i64) -> Result<(), AppError> {
    let quiz = store
        .find_quiz(id)
        .await?
        .ok_or_else(AppError::quiz_not_found)?;
    access::ensure_owner(&quiz, identity)?;

    if !store.delete_quiz(quiz.id).await? {
        return Err(AppError::quiz_not_found());
    }

    tracing::info!(quiz_id = quiz.id, owner_id = identity.id, "Quiz deleted");
    Ok(())
}

/// Checks a quiz password ahead of an attempt without recording anything.
pub async fn verify_password(
    store: &dyn QuizStore,
    identity: &Identity,
    id: i64,
    password: Option<&str>,
) -> Result<(), AppError> {
    let quiz = access::ensure_visible(store.find_quiz(id).await?, identity)?;
    access::check_quiz_password(&quiz, password)
}

fn normalize_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title cannot be blank".to_string()));
    }
    Ok(title.to_string())
}
