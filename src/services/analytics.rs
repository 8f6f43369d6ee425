// src/services/analytics.rs

//! Read-side statistics derived from stored attempts.

use crate::{
    config::RECENT_ATTEMPT_LIMIT,
    error::AppError,
    models::{
        attempt::{AttemptWithUser, answer_at},
        quiz::Quiz,
        stats::{DashboardStats, QuestionAnalytics, QuizAnalytics, RecentAttempt},
        user::Identity,
    },
    services::scoring::is_correct,
    store::{QuizFilter, QuizStore},
};

/// Dashboard counters for the caller.
pub async fn dashboard(store: &dyn QuizStore, identity: &Identity) -> Result<DashboardStats, AppError> {
    if identity.is_admin() {
        let total_quizzes = store.count_quizzes(QuizFilter::owned_by(identity.id)).await?;
        let percentages = store.owner_percentages(identity.id).await?;
        let published = store
            .count_quizzes(QuizFilter {
                published: Some(true),
                created_by: Some(identity.id),
            })
            .await?;

        Ok(DashboardStats {
            total_quizzes,
            total_attempts: percentages.len() as i64,
            average_score: mean_rounded(&percentages),
            completed_quizzes: published,
        })
    } else {
        let total_quizzes = store.count_quizzes(QuizFilter::published()).await?;
        let percentages = store.user_percentages(identity.id).await?;
        let attempts = percentages.len() as i64;

        Ok(DashboardStats {
            total_quizzes,
            total_attempts: attempts,
            average_score: mean_rounded(&percentages),
            completed_quizzes: attempts,
        })
    }
}

/// Per-quiz analytics, visible only to the quiz's owner.
pub async fn quiz_analytics(
    store: &dyn QuizStore,
    identity: &Identity,
    quiz_id: i64,
) -> Result<QuizAnalytics, AppError> {
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .filter(|q| q.is_owned_by(identity))
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    let attempts = store.list_quiz_attempts(quiz.id).await?;
    Ok(summarize(&quiz, &attempts))
}

/// Builds the analytics view from a quiz and all of its attempts.
pub fn summarize(quiz: &Quiz, attempts: &[AttemptWithUser]) -> QuizAnalytics {
    if attempts.is_empty() {
        return QuizAnalytics::default();
    }

    let total = attempts.len();
    let percentages: Vec<f64> = attempts.iter().map(|a| a.attempt.percentage).collect();

    let average_score = mean(&percentages);
    let highest_score = percentages.iter().copied().fold(f64::MIN, f64::max);
    let lowest_score = percentages.iter().copied().fold(f64::MAX, f64::min);
    let average_time = attempts
        .iter()
        .map(|a| f64::from(a.attempt.time_taken))
        .sum::<f64>()
        / total as f64;

    let mut newest: Vec<&AttemptWithUser> = attempts.iter().collect();
    newest.sort_by(|a, b| {
        (b.attempt.created_at, b.attempt.id).cmp(&(a.attempt.created_at, a.attempt.id))
    });
    let recent_attempts = newest
        .into_iter()
        .take(RECENT_ATTEMPT_LIMIT)
        .map(|a| RecentAttempt {
            user_name: a.user_name.clone(),
            percentage: a.attempt.percentage,
            time_taken: a.attempt.time_taken,
            submitted_at: a.attempt.created_at,
        })
        .collect();

    let question_analytics = quiz
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let correct = attempts
                .iter()
                .filter(|a| is_correct(question, answer_at(&a.attempt.answers, index)))
                .count();
            QuestionAnalytics {
                question_index: index,
                correct_answers: correct,
                total_answers: total,
                correct_percentage: (correct as f64 / total as f64) * 100.0,
            }
        })
        .collect();

    QuizAnalytics {
        total_attempts: total,
        average_score,
        highest_score,
        lowest_score,
        average_time,
        recent_attempts,
        question_analytics,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Mean rounded to the nearest integer; 0 for no values.
pub fn mean_rounded(values: &[f64]) -> i64 {
    mean(values).round() as i64
}
