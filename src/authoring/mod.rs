use thiserror::Error;
use time::OffsetDateTime;

use crate::http::{ApiClient, ApiError};
use crate::schemas::{Question, Quiz};

/// Curated category list offered by the editor. Free-form categories are
/// accepted when loading existing quizzes, just not offered for new ones.
pub const CATEGORIES: &[&str] = &[
    "General",
    "Science",
    "History",
    "Math",
    "Entertainment",
    "Sports",
    "Literature",
    "Personality",
    "Business",
    "Movies",
    "Music",
    "Trivia",
];

pub const MAX_CATEGORIES: usize = 5;

/// Stock cover choices offered by the editor's image picker.
pub const COVER_IMAGES: &[&str] = &[
    "/purple.png",
    "/sit.png",
    "/happy.png",
    "https://img.freepik.com/free-vector/learning-concept-illustration_114360-6186.jpg",
    "https://img.freepik.com/free-vector/learning-concept-illustration_114360-3454.jpg",
    "https://img.freepik.com/free-vector/gradient-background-knowledge-day-celebration_23-2150665651.jpg",
    "https://static.vecteezy.com/system/resources/thumbnails/003/501/025/small/distance-learning-icons-composition-vector.jpg",
    "https://static.vecteezy.com/system/resources/previews/003/112/374/non_2x/online-learning-with-teacher-free-vector.jpg",
];

pub const DEFAULT_COVER_IMAGE: &str = "/purple.png";

const DEFAULT_OPTIONS: [&str; 2] = ["Option 1", "Option 2"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Mutable editing model for one quiz. All structural edits are local;
/// nothing touches the network until `save`, which validates first and
/// refuses to issue the request on failure.
#[derive(Debug, Clone)]
pub struct QuizDraft {
    quiz: Quiz,
}

impl QuizDraft {
    /// Fresh unsaved draft with one blank multiple-choice question, open
    /// for a week starting now.
    pub fn new_draft(now: OffsetDateTime) -> Self {
        Self {
            quiz: Quiz {
                id: None,
                title: String::new(),
                description: String::new(),
                category: Vec::new(),
                cover_image: DEFAULT_COVER_IMAGE.to_string(),
                questions: vec![blank_question()],
                time_limit: 120,
                max_attempts_per_user: None,
                date_opens: now,
                date_closes: now + time::Duration::days(7),
                published: false,
                total_score: 0.0,
                creator_name: None,
                created_by: None,
            },
        }
    }

    /// Edit an existing quiz. Requires ownership; the backend answers 403
    /// for anyone but the creator.
    pub async fn load(api: &ApiClient, quiz_id: &str) -> Result<Self, ApiError> {
        let quiz = api.quiz(quiz_id).await?;
        Ok(Self { quiz })
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn id(&self) -> Option<&str> {
        self.quiz.id.as_deref()
    }

    // Metadata

    pub fn set_title(&mut self, title: &str) {
        self.quiz.title = title.to_string();
    }

    pub fn set_description(&mut self, description: &str) {
        self.quiz.description = description.to_string();
    }

    pub fn set_cover_image(&mut self, cover_image: &str) {
        self.quiz.cover_image = cover_image.to_string();
    }

    pub fn set_time_limit(&mut self, minutes: u32) {
        self.quiz.time_limit = minutes;
    }

    pub fn set_max_attempts(&mut self, max_attempts: Option<u32>) {
        self.quiz.max_attempts_per_user = max_attempts;
    }

    pub fn set_window(&mut self, opens: OffsetDateTime, closes: OffsetDateTime) {
        self.quiz.date_opens = opens;
        self.quiz.date_closes = closes;
    }

    pub fn toggle_published(&mut self) {
        self.quiz.published = !self.quiz.published;
    }

    /// No-op past the category cap or for duplicates.
    pub fn add_category(&mut self, category: &str) {
        if self.quiz.category.len() >= MAX_CATEGORIES {
            return;
        }
        if self.quiz.category.iter().any(|existing| existing == category) {
            return;
        }
        self.quiz.category.push(category.to_string());
    }

    pub fn remove_category(&mut self, category: &str) {
        self.quiz.category.retain(|existing| existing != category);
    }

    // Questions

    pub fn add_question(&mut self) {
        self.quiz.questions.push(blank_question());
    }

    pub fn remove_question(&mut self, index: usize) -> Result<(), ValidationError> {
        if self.quiz.questions.len() <= 1 {
            return Err(ValidationError("Quiz must have at least one question".to_string()));
        }
        if index < self.quiz.questions.len() {
            self.quiz.questions.remove(index);
        }
        Ok(())
    }

    pub fn set_question_text(&mut self, index: usize, text: &str) {
        if let Some(question) = self.quiz.questions.get_mut(index) {
            match question {
                Question::MultipleChoice { question_text, .. }
                | Question::ShortAnswer { question_text, .. } => {
                    *question_text = text.to_string();
                }
            }
        }
    }

    pub fn set_correct_answer(&mut self, index: usize, answer: &str) {
        if let Some(question) = self.quiz.questions.get_mut(index) {
            match question {
                Question::MultipleChoice { correct_answer, .. }
                | Question::ShortAnswer { correct_answer, .. } => {
                    *correct_answer = answer.to_string();
                }
            }
        }
    }

    pub fn set_explanation(&mut self, index: usize, text: Option<&str>) {
        if let Some(question) = self.quiz.questions.get_mut(index) {
            match question {
                Question::MultipleChoice { explanation, .. }
                | Question::ShortAnswer { explanation, .. } => {
                    *explanation = text.map(str::to_string);
                }
            }
        }
    }

    /// Retype a question in place. Going to short-answer drops the option
    /// list; going to multiple-choice seeds the two default options. Text,
    /// answer and explanation survive the switch.
    pub fn set_question_type(&mut self, index: usize, multiple_choice: bool) {
        let Some(question) = self.quiz.questions.get_mut(index) else {
            return;
        };
        if question.is_multiple_choice() == multiple_choice {
            return;
        }

        *question = match question.clone() {
            Question::MultipleChoice { id, question_text, correct_answer, explanation, .. } => {
                Question::ShortAnswer { id, question_text, correct_answer, explanation }
            }
            Question::ShortAnswer { id, question_text, correct_answer, explanation } => {
                Question::MultipleChoice {
                    id,
                    question_text,
                    options: DEFAULT_OPTIONS.iter().map(|s| s.to_string()).collect(),
                    correct_answer,
                    explanation,
                }
            }
        };
    }

    pub fn add_option(&mut self, index: usize) {
        if let Some(Question::MultipleChoice { options, .. }) = self.quiz.questions.get_mut(index) {
            options.push("New Option".to_string());
        }
    }

    pub fn remove_option(
        &mut self,
        index: usize,
        option_index: usize,
    ) -> Result<(), ValidationError> {
        if let Some(Question::MultipleChoice { options, .. }) = self.quiz.questions.get_mut(index) {
            if options.len() <= 2 {
                return Err(ValidationError(
                    "A question must have at least 2 options".to_string(),
                ));
            }
            if option_index < options.len() {
                options.remove(option_index);
            }
        }
        Ok(())
    }

    pub fn set_option(&mut self, index: usize, option_index: usize, text: &str) {
        if let Some(Question::MultipleChoice { options, .. }) = self.quiz.questions.get_mut(index) {
            if let Some(option) = options.get_mut(option_index) {
                *option = text.to_string();
            }
        }
    }

    // Persistence

    /// First failed rule wins; checks run top to bottom, metadata before
    /// questions, questions in display order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let quiz = &self.quiz;

        if quiz.title.trim().is_empty() {
            return Err(ValidationError("Quiz title is required!".to_string()));
        }
        if quiz.time_limit < 1 {
            return Err(ValidationError("Time limit must be at least 1 minute!".to_string()));
        }
        if quiz.date_closes <= quiz.date_opens {
            return Err(ValidationError(
                "Quiz closing date must be after opening date!".to_string(),
            ));
        }
        if quiz.questions.is_empty() {
            return Err(ValidationError("Quiz must have at least one question!".to_string()));
        }

        for (index, question) in quiz.questions.iter().enumerate() {
            if question.question_text().trim().is_empty() {
                return Err(ValidationError(format!("Question {} must have text!", index + 1)));
            }
            if let Some(options) = question.options() {
                if options.len() < 2 {
                    return Err(ValidationError(format!(
                        "Question {} must have at least 2 options!",
                        index + 1
                    )));
                }
            }
        }

        Ok(())
    }

    /// Validate, then replace the stored document. Validation failure means
    /// no request is issued at all.
    pub async fn save(&self, api: &ApiClient) -> Result<(), SaveError> {
        self.validate()?;
        let id = self
            .quiz
            .id
            .as_deref()
            .ok_or_else(|| ValidationError("Quiz has not been created yet".to_string()))?;
        api.save_quiz(id, &self.quiz).await?;
        tracing::info!(quiz_id = %id, "Quiz saved");
        Ok(())
    }

    pub async fn delete(self, api: &ApiClient) -> Result<(), ApiError> {
        if let Some(id) = self.quiz.id.as_deref() {
            api.delete_quiz(id).await?;
            tracing::info!(quiz_id = %id, "Quiz deleted");
        }
        Ok(())
    }
}

fn blank_question() -> Question {
    Question::MultipleChoice {
        id: None,
        question_text: String::new(),
        options: DEFAULT_OPTIONS.iter().map(|s| s.to_string()).collect(),
        correct_answer: String::new(),
        explanation: None,
    }
}
