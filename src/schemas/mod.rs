pub mod attempt;
pub mod quiz;
pub mod user;

pub use attempt::{Answer, Attempt, AttemptStatus};
pub use quiz::{Question, Quiz, QuizSummary};
pub use user::User;
