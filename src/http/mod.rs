pub mod client;
pub mod errors;

pub use client::{ApiClient, AttemptResult, QuizPage};
pub use errors::ApiError;
