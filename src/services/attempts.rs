// src/services/attempts.rs

//! Attempt submission: gate, score, persist.

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptResult, NewAttempt, SubmitAttemptRequest},
        quiz::QuizView,
        user::Identity,
    },
    services::{access, scoring},
    store::QuizStore,
};

/// Submits one attempt for `identity`.
///
/// Checks run in a fixed order and stop at the first failure, before any
/// write: visibility and publication (`NotFound`), attempt limit
/// (`Forbidden`), quiz password (`AuthError` when missing, `Forbidden` when
/// wrong). Each successful call records a new attempt; resubmissions are not
/// deduplicated.
pub async fn submit_attempt(
    store: &dyn QuizStore,
    identity: &Identity,
    req: SubmitAttemptRequest,
) -> Result<AttemptResult, AppError> {
    // 1. Resolve the quiz
    let quiz = access::ensure_attemptable(store.find_quiz(req.quiz_id).await?, identity)?;

    // 2. Attempt limit
    let attempts_made = store.count_attempts(identity.id, quiz.id).await?;
    if let Err(e) = access::ensure_attempts_remaining(&quiz, attempts_made) {
        tracing::info!(
            quiz_id = quiz.id,
            user_id = identity.id,
            attempts_made,
            "Attempt rejected: limit reached"
        );
        return Err(e);
    }

    // 3. Quiz password
    if let Err(e) = access::check_quiz_password(&quiz, req.password.as_deref()) {
        tracing::warn!(
            quiz_id = quiz.id,
            user_id = identity.id,
            "Attempt rejected: quiz password check failed"
        );
        return Err(e);
    }

    // 4. Score
    let outcome = scoring::score_answers(&quiz.questions, &req.answers);
    let time_taken = scoring::recorded_time_taken(&quiz);

    // 5. Persist, re-checking the limit atomically with the insert
    let attempt = store
        .insert_attempt_within_limit(
            NewAttempt {
                user_id: identity.id,
                quiz_id: quiz.id,
                answers: req.answers,
                score: outcome.score,
                total_marks: outcome.total_marks,
                percentage: outcome.percentage,
                time_taken,
            },
            quiz.attempt_limit(),
        )
        .await?
        .ok_or_else(|| {
            tracing::info!(
                quiz_id = quiz.id,
                user_id = identity.id,
                "Attempt rejected: limit reached by a concurrent submission"
            );
            access::attempt_limit_reached()
        })?;

    tracing::info!(
        attempt_id = attempt.id,
        quiz_id = quiz.id,
        user_id = identity.id,
        score = attempt.score,
        total_marks = attempt.total_marks,
        "Attempt recorded"
    );

    Ok(AttemptResult {
        attempt_id: attempt.id,
        quiz: QuizView::full(&quiz),
        score: attempt.score,
        total_marks: attempt.total_marks,
        percentage: attempt.percentage,
        answers: attempt.answers,
        time_taken: attempt.time_taken,
        submitted_at: attempt.created_at,
    })
}

/// The caller's own attempts on a quiz, newest first.
pub async fn list_my_attempts(
    store: &dyn QuizStore,
    identity: &Identity,
    quiz_id: i64,
) -> Result<Vec<Attempt>, AppError> {
    store.list_user_attempts(identity.id, quiz_id).await
}
