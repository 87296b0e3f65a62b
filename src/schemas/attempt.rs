use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::time::serde_flexible;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptStatus {
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "submitted")]
    Submitted,
}

/// One user's run through a quiz. `end_time` is authoritative for the
/// deadline; the client never derives it from a locally started timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(with = "serde_flexible")]
    pub start_time: OffsetDateTime,
    #[serde(default, with = "serde_flexible::option", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<OffsetDateTime>,
    pub status: AttemptStatus,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

/// Upserted per question id; an attempt never carries two answers for the
/// same question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub selected_answer: String,
}
