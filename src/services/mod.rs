// src/services/mod.rs

//! Domain operations. Handlers stay thin and delegate here; every function
//! takes the store as `&dyn QuizStore` and the caller's `Identity`.

pub mod access;
pub mod analytics;
pub mod attempts;
pub mod quizzes;
pub mod scoring;
