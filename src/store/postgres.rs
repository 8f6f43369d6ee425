// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptWithUser, NewAttempt},
        quiz::{NewQuiz, PasswordChange, Quiz, QuizChanges},
        user::{NewUser, User},
    },
    store::{QuizFilter, QuizStore},
};

const USER_COLUMNS: &str = "id, name, email, password, role, created_at";

/// Quiz columns, selected from `quizzes q JOIN users u ON u.id = q.created_by`.
const QUIZ_COLUMNS: &str = "\
    q.id, q.title, q.description, q.category, q.time_limit, q.is_published, \
    q.attempts_allowed, q.allow_previous, q.password_hash, q.created_by, \
    u.name AS creator_name, q.questions, q.created_at, q.updated_at";

const ATTEMPT_COLUMNS: &str = "\
    a.id, a.user_id, a.quiz_id, a.answers, a.score, a.total_marks, \
    a.percentage, a.time_taken, a.created_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Logs the database error with context and converts it to an internal error.
fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("{}: {:?}", context, e);
        AppError::from(e)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        // Postgres error code for unique violation is 23505
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: QuizFilter) {
    if let Some(published) = filter.published {
        builder.push(" AND q.is_published = ");
        builder.push_bind(published);
    }
    if let Some(owner) = filter.created_by {
        builder.push(" AND q.created_by = ");
        builder.push_bind(owner);
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Email '{}' is already registered", user.email))
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load user"))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load user by email"))
    }

    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError> {
        sqlx::query_as::<_, Quiz>(&format!(
            "WITH inserted AS (
                INSERT INTO quizzes
                (title, description, category, time_limit, is_published,
                 attempts_allowed, allow_previous, password_hash, created_by, questions)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
             )
             SELECT {QUIZ_COLUMNS}
             FROM inserted q
             JOIN users u ON u.id = q.created_by"
        ))
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(&quiz.category)
        .bind(quiz.time_limit)
        .bind(quiz.is_published)
        .bind(quiz.attempts_allowed)
        .bind(quiz.allow_previous)
        .bind(&quiz.password_hash)
        .bind(quiz.created_by)
        .bind(Json(&quiz.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create quiz"))
    }

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS}
             FROM quizzes q
             JOIN users u ON u.id = q.created_by
             WHERE q.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load quiz"))
    }

    async fn list_quizzes(
        &self,
        filter: QuizFilter,
        limit: Option<i64>,
    ) -> Result<Vec<Quiz>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes q JOIN users u ON u.id = q.created_by WHERE TRUE"
        ));
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY q.created_at DESC, q.id DESC");
        if let Some(limit) = limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        builder
            .build_query_as::<Quiz>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list quizzes"))
    }

    async fn count_quizzes(&self, filter: QuizFilter) -> Result<i64, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM quizzes q WHERE TRUE");
        push_filter(&mut builder, filter);

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count quizzes"))
    }

    async fn update_quiz(&self, id: i64, changes: QuizChanges) -> Result<Option<Quiz>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("WITH updated AS (UPDATE quizzes SET ");
        let mut separated = builder.separated(", ");

        separated.push("updated_at = NOW()");

        if let Some(title) = changes.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }

        if let Some(description) = changes.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }

        if let Some(category) = changes.category {
            separated.push("category = ");
            separated.push_bind_unseparated(category);
        }

        if let Some(time_limit) = changes.time_limit {
            separated.push("time_limit = ");
            separated.push_bind_unseparated(time_limit);
        }

        if let Some(is_published) = changes.is_published {
            separated.push("is_published = ");
            separated.push_bind_unseparated(is_published);
        }

        if let Some(attempts_allowed) = changes.attempts_allowed {
            separated.push("attempts_allowed = ");
            separated.push_bind_unseparated(attempts_allowed);
        }

        if let Some(allow_previous) = changes.allow_previous {
            separated.push("allow_previous = ");
            separated.push_bind_unseparated(allow_previous);
        }

        match changes.password {
            PasswordChange::Keep => {}
            PasswordChange::Set(hash) => {
                separated.push("password_hash = ");
                separated.push_bind_unseparated(hash);
            }
            PasswordChange::Clear => {
                separated.push("password_hash = NULL");
            }
        }

        if let Some(questions) = changes.questions {
            separated.push("questions = ");
            separated.push_bind_unseparated(Json(questions));
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(
            " RETURNING *) SELECT {QUIZ_COLUMNS} FROM updated q JOIN users u ON u.id = q.created_by"
        ));

        builder
            .build_query_as::<Quiz>()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to update quiz"))
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to open transaction"))?;

        sqlx::query("DELETE FROM attempts WHERE quiz_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete quiz attempts"))?;

        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete quiz"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit quiz deletion"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_attempts(&self, user_id: i64, quiz_id: i64) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attempts WHERE user_id = $1 AND quiz_id = $2",
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to count attempts"))
    }

    async fn attempt_counts_for_user(&self, user_id: i64) -> Result<HashMap<i64, i64>, AppError> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT quiz_id, COUNT(*) FROM attempts WHERE user_id = $1 GROUP BY quiz_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to count attempts per quiz"))?;

        Ok(rows.into_iter().collect())
    }

    async fn insert_attempt_within_limit(
        &self,
        attempt: NewAttempt,
        limit: i32,
    ) -> Result<Option<Attempt>, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to open transaction"))?;

        // Serializes submissions per quiz so the count below cannot go stale.
        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(attempt.quiz_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to lock quiz"))?;

        if locked.is_none() {
            return Err(AppError::quiz_not_found());
        }

        let made = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attempts WHERE user_id = $1 AND quiz_id = $2",
        )
        .bind(attempt.user_id)
        .bind(attempt.quiz_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to count attempts"))?;

        if made >= i64::from(limit) {
            return Ok(None);
        }

        let inserted = sqlx::query_as::<_, Attempt>(
            "INSERT INTO attempts
             (user_id, quiz_id, answers, score, total_marks, percentage, time_taken)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, user_id, quiz_id, answers, score, total_marks,
                       percentage, time_taken, created_at",
        )
        .bind(attempt.user_id)
        .bind(attempt.quiz_id)
        .bind(Json(&attempt.answers))
        .bind(attempt.score)
        .bind(attempt.total_marks)
        .bind(attempt.percentage)
        .bind(attempt.time_taken)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to save attempt"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit attempt"))?;

        Ok(Some(inserted))
    }

    async fn list_user_attempts(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Vec<Attempt>, AppError> {
        sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS}
             FROM attempts a
             WHERE a.user_id = $1 AND a.quiz_id = $2
             ORDER BY a.created_at DESC, a.id DESC"
        ))
        .bind(user_id)
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list user attempts"))
    }

    async fn list_quiz_attempts(&self, quiz_id: i64) -> Result<Vec<AttemptWithUser>, AppError> {
        sqlx::query_as::<_, AttemptWithUser>(&format!(
            "SELECT {ATTEMPT_COLUMNS}, u.name AS user_name
             FROM attempts a
             JOIN users u ON u.id = a.user_id
             WHERE a.quiz_id = $1
             ORDER BY a.created_at DESC, a.id DESC"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list quiz attempts"))
    }

    async fn user_percentages(&self, user_id: i64) -> Result<Vec<f64>, AppError> {
        sqlx::query_scalar::<_, f64>("SELECT percentage FROM attempts WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to load user scores"))
    }

    async fn owner_percentages(&self, owner_id: i64) -> Result<Vec<f64>, AppError> {
        sqlx::query_scalar::<_, f64>(
            "SELECT a.percentage
             FROM attempts a
             JOIN quizzes q ON q.id = a.quiz_id
             WHERE q.created_by = $1",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load owner scores"))
    }
}
