use crate::http::{ApiClient, ApiError, AttemptResult};
use crate::schemas::{Attempt, Quiz};

/// Scored result plus the per-question rows the result page renders.
#[derive(Debug, Clone)]
pub struct AttemptReview {
    pub result: AttemptResult,
    pub rows: Vec<QuestionReview>,
}

/// One question of a graded attempt, lined up against the taker's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionReview {
    pub question_id: String,
    pub question_text: String,
    pub selected: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// Attempt detail for its owner or the quiz creator; anyone else gets
/// `Forbidden`, which callers must keep distinct from `NotFound`.
pub async fn load_result(api: &ApiClient, attempt_id: &str) -> Result<AttemptReview, ApiError> {
    let result = api.attempt_detail(attempt_id).await?;
    let rows = review_rows(&result.quiz, &result.attempt);
    Ok(AttemptReview { result, rows })
}

/// All submissions for a quiz. Creator-only; 403 otherwise.
pub async fn load_submissions(api: &ApiClient, quiz_id: &str) -> Result<Vec<Attempt>, ApiError> {
    api.submissions_for_quiz(quiz_id).await
}

pub async fn load_my_attempts(api: &ApiClient) -> Result<Vec<Attempt>, ApiError> {
    api.my_attempts().await
}

/// Join the quiz's questions with the attempt's answers in question order.
/// Unanswered questions still get a row, marked incorrect. Grading itself
/// happened server-side; the correctness flag here only feeds display.
pub fn review_rows(quiz: &Quiz, attempt: &Attempt) -> Vec<QuestionReview> {
    quiz.questions
        .iter()
        .map(|question| {
            let question_id = question.id().unwrap_or_default().to_string();
            let selected = attempt
                .answers
                .iter()
                .find(|answer| answer.question_id == question_id)
                .map(|answer| answer.selected_answer.clone());
            let correct_answer = question.correct_answer().to_string();
            let is_correct = selected
                .as_deref()
                .is_some_and(|value| value.trim().eq_ignore_ascii_case(correct_answer.trim()));

            QuestionReview {
                question_id,
                question_text: question.question_text().to_string(),
                selected,
                correct_answer,
                is_correct,
                explanation: question.explanation().map(str::to_string),
            }
        })
        .collect()
}
