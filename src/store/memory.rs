// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptWithUser, NewAttempt},
        quiz::{NewQuiz, PasswordChange, Quiz, QuizChanges},
        user::{NewUser, User},
    },
    store::{QuizFilter, QuizStore},
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    quizzes: BTreeMap<i64, Quiz>,
    attempts: BTreeMap<i64, Attempt>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_name(&self, id: i64) -> String {
        self.users
            .get(&id)
            .map(|u| u.name.clone())
            .unwrap_or_default()
    }
}

/// In-process store with the same semantics as [`super::PgStore`].
/// Every mutation holds the single write lock, so check-and-insert is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, ties broken by id.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                user.email
            )));
        }

        let id = tables.next_id();
        let created = User {
            id,
            name: user.name,
            email: user.email,
            password: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());

        Ok(created)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&quiz.created_by) {
            return Err(AppError::InternalServerError(format!(
                "quiz creator {} does not exist",
                quiz.created_by
            )));
        }

        let id = tables.next_id();
        let now = Utc::now();
        let created = Quiz {
            id,
            title: quiz.title,
            description: quiz.description,
            category: quiz.category,
            time_limit: quiz.time_limit,
            is_published: quiz.is_published,
            attempts_allowed: quiz.attempts_allowed,
            allow_previous: quiz.allow_previous,
            password_hash: quiz.password_hash,
            created_by: quiz.created_by,
            creator_name: tables.user_name(quiz.created_by),
            questions: quiz.questions,
            created_at: now,
            updated_at: now,
        };
        tables.quizzes.insert(id, created.clone());

        Ok(created)
    }

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        Ok(self.tables.read().await.quizzes.get(&id).cloned())
    }

    async fn list_quizzes(
        &self,
        filter: QuizFilter,
        limit: Option<i64>,
    ) -> Result<Vec<Quiz>, AppError> {
        let tables = self.tables.read().await;
        let mut quizzes: Vec<Quiz> = tables
            .quizzes
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        newest_first(&mut quizzes, |q| (q.created_at, q.id));

        if let Some(limit) = limit {
            quizzes.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }

        Ok(quizzes)
    }

    async fn count_quizzes(&self, filter: QuizFilter) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.quizzes.values().filter(|q| filter.matches(q)).count() as i64)
    }

    async fn update_quiz(&self, id: i64, changes: QuizChanges) -> Result<Option<Quiz>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(quiz) = tables.quizzes.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            quiz.title = title;
        }
        if let Some(description) = changes.description {
            quiz.description = description;
        }
        if let Some(category) = changes.category {
            quiz.category = category;
        }
        if let Some(time_limit) = changes.time_limit {
            quiz.time_limit = time_limit;
        }
        if let Some(is_published) = changes.is_published {
            quiz.is_published = is_published;
        }
        if let Some(attempts_allowed) = changes.attempts_allowed {
            quiz.attempts_allowed = attempts_allowed;
        }
        if let Some(allow_previous) = changes.allow_previous {
            quiz.allow_previous = allow_previous;
        }
        match changes.password {
            PasswordChange::Keep => {}
            PasswordChange::Set(hash) => quiz.password_hash = Some(hash),
            PasswordChange::Clear => quiz.password_hash = None,
        }
        if let Some(questions) = changes.questions {
            quiz.questions = questions;
        }
        quiz.updated_at = Utc::now();

        Ok(Some(quiz.clone()))
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        tables.attempts.retain(|_, a| a.quiz_id != id);
        Ok(tables.quizzes.remove(&id).is_some())
    }

    async fn count_attempts(&self, user_id: i64, quiz_id: i64) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .count() as i64)
    }

    async fn attempt_counts_for_user(&self, user_id: i64) -> Result<HashMap<i64, i64>, AppError> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for attempt in tables.attempts.values().filter(|a| a.user_id == user_id) {
            *counts.entry(attempt.quiz_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn insert_attempt_within_limit(
        &self,
        attempt: NewAttempt,
        limit: i32,
    ) -> Result<Option<Attempt>, AppError> {
        let mut tables = self.tables.write().await;

        if !tables.quizzes.contains_key(&attempt.quiz_id) {
            return Err(AppError::quiz_not_found());
        }

        let made = tables
            .attempts
            .values()
            .filter(|a| a.user_id == attempt.user_id && a.quiz_id == attempt.quiz_id)
            .count() as i64;
        if made >= i64::from(limit) {
            return Ok(None);
        }

        let id = tables.next_id();
        let created = Attempt {
            id,
            user_id: attempt.user_id,
            quiz_id: attempt.quiz_id,
            answers: attempt.answers,
            score: attempt.score,
            total_marks: attempt.total_marks,
            percentage: attempt.percentage,
            time_taken: attempt.time_taken,
            created_at: Utc::now(),
        };
        tables.attempts.insert(id, created.clone());

        Ok(Some(created))
    }

    async fn list_user_attempts(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Vec<Attempt>, AppError> {
        let tables = self.tables.read().await;
        let mut attempts: Vec<Attempt> = tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .cloned()
            .collect();
        newest_first(&mut attempts, |a| (a.created_at, a.id));
        Ok(attempts)
    }

    async fn list_quiz_attempts(&self, quiz_id: i64) -> Result<Vec<AttemptWithUser>, AppError> {
        let tables = self.tables.read().await;
        let mut attempts: Vec<AttemptWithUser> = tables
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id)
            .map(|a| AttemptWithUser {
                attempt: a.clone(),
                user_name: tables.user_name(a.user_id),
            })
            .collect();
        newest_first(&mut attempts, |a| (a.attempt.created_at, a.attempt.id));
        Ok(attempts)
    }

    async fn user_percentages(&self, user_id: i64) -> Result<Vec<f64>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.percentage)
            .collect())
    }

    async fn owner_percentages(&self, owner_id: i64) -> Result<Vec<f64>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .values()
            .filter(|a| {
                tables
                    .quizzes
                    .get(&a.quiz_id)
                    .is_some_and(|q| q.created_by == owner_id)
            })
            .map(|a| a.percentage)
            .collect())
    }
}
