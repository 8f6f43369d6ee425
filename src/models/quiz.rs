// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::{error::AppError, models::user::Identity};

pub const DEFAULT_TIME_LIMIT: i32 = 30;
pub const DEFAULT_ATTEMPTS_ALLOWED: i32 = 1;
pub const DEFAULT_MARKS: i32 = 1;
pub const MAX_QUESTIONS: usize = 500;

/// A multiple-choice question embedded in a quiz.
/// Addressed only by its position in the quiz's question list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_text: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_answer: usize,
    pub marks: i32,
}

/// Represents the 'quizzes' table joined with the creator's name.
///
/// This is the privileged projection: it carries the password hash and is
/// never serialized. Callers only ever see a [`QuizView`].
#[derive(Debug, Clone, FromRow)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Minutes.
    pub time_limit: i32,
    pub is_published: bool,
    pub attempts_allowed: i32,
    pub allow_previous: bool,
    pub password_hash: Option<String>,
    pub created_by: i64,
    pub creator_name: String,

    /// Stored as a JSONB array in the database.
    #[sqlx(json)]
    pub questions: Vec<Question>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Quiz {
    pub fn requires_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        identity.is_admin() && self.created_by == identity.id
    }

    /// Attempts allowed per identity, never less than one.
    pub fn attempt_limit(&self) -> i32 {
        self.attempts_allowed.max(1)
    }
}

/// Public projection of a question. `correct_answer` is withheld from
/// everyone except the quiz owner until an attempt has been scored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub question_text: String,
    pub options: Vec<String>,
    pub marks: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Creator {
    pub id: i64,
    pub name: String,
}

/// Public projection of a quiz, safe to hand to any caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub time_limit: i32,
    pub is_published: bool,
    pub attempts_allowed: i32,
    pub allow_previous: bool,
    pub requires_password: bool,
    pub created_by: Creator,
    pub questions: Vec<QuestionView>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_made: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_attempt: Option<bool>,
}

impl QuizView {
    /// Full definition including correct answers.
    pub fn full(quiz: &Quiz) -> Self {
        Self::build(quiz, true)
    }

    /// Definition as seen by `identity`, annotated with the caller's attempt
    /// count. Correct answers are shown to the owner and to anyone who has
    /// already submitted an attempt, so past attempts can be reviewed.
    pub fn for_viewer(quiz: &Quiz, identity: &Identity, attempts_made: i64) -> Self {
        let reveal_answers = quiz.is_owned_by(identity) || attempts_made > 0;
        Self::build(quiz, reveal_answers).with_attempts(attempts_made)
    }

    fn with_attempts(mut self, attempts_made: i64) -> Self {
        self.attempts_made = Some(attempts_made);
        self.can_attempt = Some(attempts_made < i64::from(self.attempts_allowed));
        self
    }

    fn build(quiz: &Quiz, reveal_answers: bool) -> Self {
        let questions = quiz
            .questions
            .iter()
            .map(|q| QuestionView {
                question_text: q.question_text.clone(),
                options: q.options.clone(),
                marks: q.marks,
                correct_answer: reveal_answers.then_some(q.correct_answer),
            })
            .collect();

        Self {
            id: quiz.id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            category: quiz.category.clone(),
            time_limit: quiz.time_limit,
            is_published: quiz.is_published,
            attempts_allowed: quiz.attempt_limit(),
            allow_previous: quiz.allow_previous,
            requires_password: quiz.requires_password(),
            created_by: Creator {
                id: quiz.created_by,
                name: quiz.creator_name.clone(),
            },
            questions,
            created_at: quiz.created_at,
            updated_at: quiz.updated_at,
            attempts_made: None,
            can_attempt: None,
        }
    }
}

/// Insert payload handed to the store.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub description: String,
    pub category: String,
    pub time_limit: i32,
    pub is_published: bool,
    pub attempts_allowed: i32,
    pub allow_previous: bool,
    pub password_hash: Option<String>,
    pub created_by: i64,
    pub questions: Vec<Question>,
}

/// What an update does to the stored password hash.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PasswordChange {
    #[default]
    Keep,
    Set(String),
    Clear,
}

/// Partial update handed to the store. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct QuizChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub time_limit: Option<i32>,
    pub is_published: Option<bool>,
    pub attempts_allowed: Option<i32>,
    pub allow_previous: Option<bool>,
    pub password: PasswordChange,
    pub questions: Option<Vec<Question>>,
}

/// DTO for one question inside a create/update payload.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 2000, message = "Question text must be 1 to 2000 chars"))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    pub correct_answer: i64,
    #[validate(range(min = 1, max = 1000, message = "Marks must be between 1 and 1000"))]
    pub marks: Option<i64>,
}

impl QuestionInput {
    /// Checks the correct-answer index against the options and applies defaults.
    /// Field-level rules are expected to have passed already.
    pub fn into_question(self, position: usize) -> Result<Question, AppError> {
        let correct_answer = usize::try_from(self.correct_answer)
            .ok()
            .filter(|index| *index < self.options.len())
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Question {}: correctAnswer must index one of its {} options",
                    position,
                    self.options.len()
                ))
            })?;

        let marks = match self.marks {
            Some(marks) => i32::try_from(marks)
                .map_err(|_| AppError::BadRequest(format!("Question {}: invalid marks", position)))?,
            None => DEFAULT_MARKS,
        };

        Ok(Question {
            question_text: self.question_text.trim().to_string(),
            options: self.options,
            correct_answer,
            marks,
        })
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    if options.len() > 26 {
        return Err(validator::ValidationError::new("too_many_options"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_blank"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// DTO for creating a new quiz.
///
/// `attemptsAllowed` and `allowPrevious` are taken as raw JSON and normalized,
/// since clients send them as numbers, strings or booleans interchangeably.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 chars"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 1, max = 1440, message = "Time limit must be 1 to 1440 minutes"))]
    pub time_limit: Option<i64>,
    pub is_published: Option<bool>,
    pub attempts_allowed: Option<Value>,
    pub allow_previous: Option<Value>,
    #[validate(length(max = 128))]
    pub quiz_password: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 chars"))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 1, max = 1440, message = "Time limit must be 1 to 1440 minutes"))]
    pub time_limit: Option<i64>,
    pub is_published: Option<bool>,
    pub attempts_allowed: Option<Value>,
    pub allow_previous: Option<Value>,
    #[validate(length(max = 128))]
    pub quiz_password: Option<String>,
    #[validate(nested)]
    pub questions: Option<Vec<QuestionInput>>,
}

/// Body of the verify-password call.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyPasswordRequest {
    pub password: Option<String>,
}

/// Converts validated question inputs into stored questions.
pub fn build_questions(inputs: Vec<QuestionInput>) -> Result<Vec<Question>, AppError> {
    if inputs.len() > MAX_QUESTIONS {
        return Err(AppError::BadRequest(format!(
            "A quiz can hold at most {} questions",
            MAX_QUESTIONS
        )));
    }

    inputs
        .into_iter()
        .enumerate()
        .map(|(position, input)| input.into_question(position))
        .collect()
}

/// Normalizes an attempts-allowed value to an integer >= 1.
///
/// Numbers are truncated, numeric strings parsed; anything else, or any
/// result below one, falls back to the default of one.
pub fn normalize_attempts_allowed(value: Option<&Value>) -> i32 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => parse_leading_int(s),
        _ => None,
    };

    parsed
        .filter(|n| *n >= 1)
        .map(|n| i32::try_from(n).unwrap_or(i32::MAX))
        .unwrap_or(DEFAULT_ATTEMPTS_ALLOWED)
}

/// Normalizes a loosely-typed flag to a boolean using JSON truthiness.
pub fn normalize_flag(value: Option<&Value>, default: bool) -> bool {
    match value {
        None => default,
        Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Parses an optional sign followed by leading digits, ignoring the rest ("3 tries" -> 3).
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
