// src/services/access.rs

//! Access rules for quizzes and attempts. These functions decide; they never
//! perform the guarded action themselves.

use crate::{
    error::AppError,
    models::{quiz::Quiz, user::Identity},
    store::QuizFilter,
    utils::hash::verify_password,
};

/// Which quizzes `identity` may list: students see published quizzes,
/// admins see the quizzes they created.
pub fn visibility_filter(identity: &Identity) -> QuizFilter {
    if identity.is_admin() {
        QuizFilter::owned_by(identity.id)
    } else {
        QuizFilter::published()
    }
}

pub fn can_view(quiz: &Quiz, identity: &Identity) -> bool {
    visibility_filter(identity).matches(quiz)
}

/// Resolves a looked-up quiz to one the caller may see.
/// Absent and hidden quizzes produce the same `NotFound`.
pub fn ensure_visible(quiz: Option<Quiz>, identity: &Identity) -> Result<Quiz, AppError> {
    quiz.filter(|q| can_view(q, identity))
        .ok_or_else(AppError::quiz_not_found)
}

/// Only the admin who created a quiz may change or delete it.
pub fn ensure_owner(quiz: &Quiz, identity: &Identity) -> Result<(), AppError> {
    if quiz.is_owned_by(identity) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}

/// Starting or submitting requires a published quiz the caller can see.
pub fn ensure_attemptable(quiz: Option<Quiz>, identity: &Identity) -> Result<Quiz, AppError> {
    let quiz = ensure_visible(quiz, identity)?;
    if !quiz.is_published {
        return Err(AppError::quiz_not_found());
    }
    Ok(quiz)
}

pub fn ensure_attempts_remaining(quiz: &Quiz, attempts_made: i64) -> Result<(), AppError> {
    if attempts_made < i64::from(quiz.attempt_limit()) {
        Ok(())
    } else {
        Err(attempt_limit_reached())
    }
}

pub fn attempt_limit_reached() -> AppError {
    AppError::Forbidden("Attempt limit reached for this quiz".to_string())
}

/// Checks a supplied plaintext password against the quiz's stored hash.
///
/// Quizzes without a password always pass. A missing (or empty) password is
/// `AuthError`; a wrong one is `Forbidden`.
pub fn check_quiz_password(quiz: &Quiz, supplied: Option<&str>) -> Result<(), AppError> {
    let Some(hash) = quiz.password_hash.as_deref() else {
        return Ok(());
    };

    let supplied = supplied
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::AuthError("Quiz password required".to_string()))?;

    if verify_password(supplied, hash)? {
        Ok(())
    } else {
        Err(AppError::Forbidden("Incorrect quiz password".to_string()))
    }
}
