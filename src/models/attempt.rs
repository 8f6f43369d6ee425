// src/models/attempt.rs

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use crate::models::quiz::QuizView;

/// Answers exactly as submitted: `{"0": 2, "1": 0}`.
///
/// Keys are question positions and values option indices, but nothing is
/// enforced on the way in. Entries that are not a valid position/index pair
/// are kept verbatim and simply never match; use [`answer_at`] to read.
pub type AnswerMap = Map<String, Value>;

/// The chosen option for question `index`, if the submission holds an
/// integral number under that key.
pub fn answer_at(answers: &AnswerMap, index: usize) -> Option<i64> {
    match answers.get(&index.to_string())? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        _ => None,
    }
}

/// `null` and a missing field both mean "no answers".
fn answers_or_empty<'de, D>(deserializer: D) -> Result<AnswerMap, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<AnswerMap>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Represents the 'attempts' table in the database.
/// Rows are written once and never updated.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,

    #[sqlx(json)]
    pub answers: AnswerMap,

    pub score: i32,
    pub total_marks: i32,
    pub percentage: f64,
    /// Seconds.
    pub time_taken: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// An attempt joined with the attempting user's display name.
#[derive(Debug, Clone, FromRow)]
pub struct AttemptWithUser {
    #[sqlx(flatten)]
    pub attempt: Attempt,
    pub user_name: String,
}

/// Insert payload handed to the store.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: i64,
    pub quiz_id: i64,
    pub answers: AnswerMap,
    pub score: i32,
    pub total_marks: i32,
    pub percentage: f64,
    pub time_taken: i32,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    pub quiz_id: i64,

    /// Key: question index. Value: chosen option index.
    #[serde(default, deserialize_with = "answers_or_empty")]
    pub answers: AnswerMap,

    /// Plaintext quiz password, when the quiz has one.
    pub password: Option<String>,
}

/// Scored result returned from a submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub attempt_id: i64,
    /// Full quiz definition, correct answers included, password hash excluded.
    pub quiz: QuizView,
    pub score: i32,
    pub total_marks: i32,
    pub percentage: f64,
    pub answers: AnswerMap,
    pub time_taken: i32,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn answers_keep_string_keys() {
        let request: SubmitAttemptRequest = serde_json::from_value(json!({
            "quizId": 4,
            "answers": { "0": 2, "3": 1 }
        }))
        .unwrap();
        assert_eq!(answer_at(&request.answers, 0), Some(2));
        assert_eq!(answer_at(&request.answers, 3), Some(1));
        assert_eq!(answer_at(&request.answers, 1), None);
        assert!(request.password.is_none());

        let encoded = serde_json::to_value(&request.answers).unwrap();
        assert_eq!(encoded, json!({ "0": 2, "3": 1 }));
    }

    #[test]
    fn odd_answer_entries_are_accepted_and_ignored() {
        let request: SubmitAttemptRequest = serde_json::from_value(json!({
            "quizId": 4,
            "answers": { "0": 1, "-1": 1, "x": 0, "1": null, "2": "2", "3": 2.0, "4": 1.5 }
        }))
        .unwrap();
        assert_eq!(request.answers.len(), 7);
        assert_eq!(answer_at(&request.answers, 0), Some(1));
        assert_eq!(answer_at(&request.answers, 1), None);
        assert_eq!(answer_at(&request.answers, 2), None);
        assert_eq!(answer_at(&request.answers, 3), Some(2));
        assert_eq!(answer_at(&request.answers, 4), None);
    }

    #[test]
    fn null_answers_mean_none() {
        let request: SubmitAttemptRequest =
            serde_json::from_value(json!({ "quizId": 1, "answers": null })).unwrap();
        assert!(request.answers.is_empty());
    }

    #[test]
    fn missing_answers_default_to_empty() {
        let request: SubmitAttemptRequest =
            serde_json::from_value(json!({ "quizId": 1, "password": "pw" })).unwrap();
        assert!(request.answers.is_empty());
        assert_eq!(request.password.as_deref(), Some("pw"));
    }
}
