use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::time::serde_flexible;

/// Full quiz document as authored and as returned by the detail routes.
/// Saved back to the backend as a whole-document replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub cover_image: String,
    pub questions: Vec<Question>,
    pub time_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts_per_user: Option<u32>,
    #[serde(with = "serde_flexible")]
    pub date_opens: OffsetDateTime,
    #[serde(with = "serde_flexible")]
    pub date_closes: OffsetDateTime,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub total_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Question polymorphism is carried in the wire `type` tag; the option list
/// exists only on the multiple-choice variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Question {
    #[serde(rename = "multiple-choice", rename_all = "camelCase")]
    MultipleChoice {
        #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        question_text: String,
        options: Vec<String>,
        // Absent on the quiz-taking view; the backend strips it.
        #[serde(default)]
        correct_answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
    #[serde(rename = "short-answer", rename_all = "camelCase")]
    ShortAnswer {
        #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        question_text: String,
        #[serde(default)]
        correct_answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
}

impl Question {
    pub fn id(&self) -> Option<&str> {
        match self {
            Question::MultipleChoice { id, .. } | Question::ShortAnswer { id, .. } => id.as_deref(),
        }
    }

    pub fn question_text(&self) -> &str {
        match self {
            Question::MultipleChoice { question_text, .. }
            | Question::ShortAnswer { question_text, .. } => question_text,
        }
    }

    pub fn correct_answer(&self) -> &str {
        match self {
            Question::MultipleChoice { correct_answer, .. }
            | Question::ShortAnswer { correct_answer, .. } => correct_answer,
        }
    }

    pub fn explanation(&self) -> Option<&str> {
        match self {
            Question::MultipleChoice { explanation, .. }
            | Question::ShortAnswer { explanation, .. } => explanation.as_deref(),
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            Question::MultipleChoice { options, .. } => Some(options),
            Question::ShortAnswer { .. } => None,
        }
    }

    pub fn is_multiple_choice(&self) -> bool {
        matches!(self, Question::MultipleChoice { .. })
    }
}

/// Catalog and my-quizzes list projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub time_limit: u32,
    #[serde(default)]
    pub creator_name: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub attempt_count: u64,
}
