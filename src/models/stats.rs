// src/models/stats.rs

use serde::Serialize;

/// Dashboard counters for the current caller.
///
/// For admins the counts cover the quizzes they own; for students they cover
/// published quizzes and the student's own attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_quizzes: i64,
    pub total_attempts: i64,
    /// Mean percentage, rounded to the nearest integer.
    pub average_score: i64,
    pub completed_quizzes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAttempt {
    pub user_name: String,
    pub percentage: f64,
    pub time_taken: i32,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalytics {
    pub question_index: usize,
    pub correct_answers: usize,
    pub total_answers: usize,
    pub correct_percentage: f64,
}

/// Per-quiz analytics for the owning admin.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnalytics {
    pub total_attempts: usize,
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    /// Seconds.
    pub average_time: f64,
    pub recent_attempts: Vec<RecentAttempt>,
    pub question_analytics: Vec<QuestionAnalytics>,
}
