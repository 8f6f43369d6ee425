// src/store/mod.rs

//! Storage seam. Handlers and services only talk to [`QuizStore`]; the
//! concrete backend is picked once at startup.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptWithUser, NewAttempt},
        quiz::{NewQuiz, Quiz, QuizChanges},
        user::{NewUser, User},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle used in `AppState`.
pub type DynStore = Arc<dyn QuizStore>;

/// Quiz selection. `None` fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizFilter {
    pub published: Option<bool>,
    pub created_by: Option<i64>,
}

impl QuizFilter {
    pub fn published() -> Self {
        Self {
            published: Some(true),
            created_by: None,
        }
    }

    pub fn owned_by(owner_id: i64) -> Self {
        Self {
            published: None,
            created_by: Some(owner_id),
        }
    }

    pub fn matches(&self, quiz: &Quiz) -> bool {
        self.published.is_none_or(|p| quiz.is_published == p)
            && self.created_by.is_none_or(|owner| quiz.created_by == owner)
    }
}

/// Persistence operations the application needs.
///
/// Lists come back newest first (creation time, then id, descending).
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError>;
    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError>;
    async fn list_quizzes(
        &self,
        filter: QuizFilter,
        limit: Option<i64>,
    ) -> Result<Vec<Quiz>, AppError>;
    async fn count_quizzes(&self, filter: QuizFilter) -> Result<i64, AppError>;
    /// Returns `None` when the quiz does not exist.
    async fn update_quiz(&self, id: i64, changes: QuizChanges) -> Result<Option<Quiz>, AppError>;
    /// Deletes the quiz and every attempt referencing it. Returns `false` when absent.
    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError>;

    async fn count_attempts(&self, user_id: i64, quiz_id: i64) -> Result<i64, AppError>;
    /// Attempt counts of one user, keyed by quiz id. Quizzes without attempts are absent.
    async fn attempt_counts_for_user(&self, user_id: i64) -> Result<HashMap<i64, i64>, AppError>;
    /// Inserts the attempt only if the user has fewer than `limit` attempts on
    /// the quiz; the check and the write happen as one storage operation.
    /// Returns `None` when the limit is already reached.
    async fn insert_attempt_within_limit(
        &self,
        attempt: NewAttempt,
        limit: i32,
    ) -> Result<Option<Attempt>, AppError>;
    async fn list_user_attempts(&self, user_id: i64, quiz_id: i64)
    -> Result<Vec<Attempt>, AppError>;
    async fn list_quiz_attempts(&self, quiz_id: i64) -> Result<Vec<AttemptWithUser>, AppError>;

    /// Percentages of every attempt made by `user_id`.
    async fn user_percentages(&self, user_id: i64) -> Result<Vec<f64>, AppError>;
    /// Percentages of every attempt on quizzes owned by `owner_id`.
    async fn owner_percentages(&self, owner_id: i64) -> Result<Vec<f64>, AppError>;
}
