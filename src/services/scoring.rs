// src/services/scoring.rs

use crate::models::{
    attempt::{AnswerMap, answer_at},
    quiz::{Question, Quiz},
};

/// Outcome of scoring one submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub score: i32,
    pub total_marks: i32,
    pub percentage: f64,
}

/// Scores `answers` against the quiz questions.
///
/// A question earns its marks only when the answer at its index equals the
/// correct option. Missing, non-integer or out-of-range answers earn nothing;
/// keys that are not question positions are ignored.
pub fn score_answers(questions: &[Question], answers: &AnswerMap) -> Score {
    let mut score: i32 = 0;
    let mut total_marks: i32 = 0;

    for (index, question) in questions.iter().enumerate() {
        let marks = question.marks.max(0);
        total_marks = total_marks.saturating_add(marks);
        if is_correct(question, answer_at(answers, index)) {
            score = score.saturating_add(marks);
        }
    }

    Score {
        score,
        total_marks,
        percentage: percentage(score, total_marks),
    }
}

pub fn is_correct(question: &Question, answer: Option<i64>) -> bool {
    answer
        .and_then(|choice| usize::try_from(choice).ok())
        .is_some_and(|choice| choice == question.correct_answer)
}

/// `score / total * 100`, or 0 when nothing can be scored.
pub fn percentage(score: i32, total_marks: i32) -> f64 {
    if total_marks > 0 {
        (f64::from(score) / f64::from(total_marks)) * 100.0
    } else {
        0.0
    }
}

/// Recorded duration of an attempt: the quiz's full time limit in seconds.
/// Client-reported durations are not trusted.
pub fn recorded_time_taken(quiz: &Quiz) -> i32 {
    quiz.time_limit.saturating_mul(60)
}
