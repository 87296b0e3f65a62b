use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::core::config::Settings;
use crate::http::errors::{extract_error_detail, ApiError};
use crate::schemas::{Attempt, Quiz, QuizSummary, User};
use crate::session::token::TokenStore;

/// Thin typed wrapper over the backend's HTTP routes. One method per route;
/// the bearer token is read from the shared store per request, and a 401
/// invalidates it for every component holding the store.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

/// One page of the quiz catalog. `total_pages` is floored to 1 so page-1
/// requests against an empty catalog stay valid.
#[derive(Debug, Clone)]
pub struct QuizPage {
    pub items: Vec<QuizSummary>,
    pub total_pages: u32,
}

/// Scored attempt together with the quiz snapshot it was graded against.
#[derive(Debug, Clone, Deserialize)]
pub struct AttemptResult {
    pub attempt: Attempt,
    #[serde(rename = "attemptedQuiz")]
    pub quiz: Quiz,
    #[serde(rename = "attemptorName")]
    pub attemptor_name: String,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct QuizEnvelope {
    quiz: Quiz,
}

#[derive(Deserialize)]
struct QuizListEnvelope {
    #[serde(default)]
    quizzes: Vec<QuizSummary>,
}

#[derive(Deserialize)]
struct CatalogEnvelope {
    #[serde(default)]
    quizzes: Vec<QuizSummary>,
    #[serde(rename = "totalPages", default)]
    total_pages: u32,
}

#[derive(Deserialize)]
struct AttemptListEnvelope {
    #[serde(default)]
    attempts: Vec<Attempt>,
}

impl ApiClient {
    pub fn from_settings(
        settings: &Settings,
        tokens: Arc<dyn TokenStore>,
    ) -> anyhow::Result<Self> {
        let backend = settings.backend();
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(backend.connect_timeout_seconds))
            .timeout(Duration::from_secs(backend.timeout_seconds))
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self { http, base_url: backend.base_url.clone(), tokens })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    // Auth

    pub async fn me(&self) -> Result<User, ApiError> {
        let response = self.authed(self.http.get(self.url("/auth/me"))).send().await?;
        let envelope: UserEnvelope = self.read_json(response).await?;
        Ok(envelope.user)
    }

    /// Login entry point; the callback destination rides in `state` so the
    /// auth callback can return the user to where they started.
    pub fn login_url(&self, callback: &str) -> String {
        let mut url = format!("{}/auth/google", self.base_url);
        if let Ok(mut parsed) = reqwest::Url::parse(&url) {
            parsed.query_pairs_mut().append_pair("state", callback);
            url = parsed.to_string();
        }
        url
    }

    // Quizzes

    pub async fn search_quizzes(
        &self,
        search: &str,
        category: &str,
        page: u32,
        limit: u32,
    ) -> Result<QuizPage, ApiError> {
        let response = self
            .http
            .get(self.url("/quiz/all"))
            .query(&[
                ("search", search),
                ("category", category),
                ("page", &page.to_string()),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?;
        let envelope: CatalogEnvelope = self.read_json(response).await?;
        Ok(QuizPage { items: envelope.quizzes, total_pages: envelope.total_pages.max(1) })
    }

    /// Public detail view; the backend omits the question payloads' answers.
    pub async fn quiz_details(&self, quiz_id: &str) -> Result<Quiz, ApiError> {
        let response =
            self.http.get(self.url(&format!("/quiz/details/{quiz_id}"))).send().await?;
        let envelope: QuizEnvelope = self.read_json(response).await?;
        Ok(envelope.quiz)
    }

    /// Full document for the owner (authoring) and for the quiz-taking flow.
    pub async fn quiz(&self, quiz_id: &str) -> Result<Quiz, ApiError> {
        let response =
            self.authed(self.http.get(self.url(&format!("/quiz/{quiz_id}")))).send().await?;
        let envelope: QuizEnvelope = self.read_json(response).await?;
        Ok(envelope.quiz)
    }

    /// Whole-document replace.
    pub async fn save_quiz(&self, quiz_id: &str, quiz: &Quiz) -> Result<(), ApiError> {
        let response = self
            .authed(self.http.put(self.url(&format!("/quiz/edit/{quiz_id}"))))
            .json(quiz)
            .send()
            .await?;
        self.read_empty(response).await
    }

    pub async fn delete_quiz(&self, quiz_id: &str) -> Result<(), ApiError> {
        let response = self
            .authed(self.http.delete(self.url(&format!("/quiz/delete/{quiz_id}"))))
            .send()
            .await?;
        self.read_empty(response).await
    }

    pub async fn my_quizzes(&self) -> Result<Vec<QuizSummary>, ApiError> {
        let response = self.authed(self.http.get(self.url("/quiz/my-quizzes"))).send().await?;
        let envelope: QuizListEnvelope = self.read_json(response).await?;
        Ok(envelope.quizzes)
    }

    // Attempts

    /// Existing in-progress attempt for (current user, quiz); `NotFound`
    /// means none and the caller should start one.
    pub async fn attempt_for_quiz(&self, quiz_id: &str) -> Result<Attempt, ApiError> {
        let response = self
            .authed(self.http.get(self.url(&format!("/attempt/quiz/{quiz_id}"))))
            .send()
            .await?;
        self.read_json(response).await
    }

    pub async fn start_attempt(&self, quiz_id: &str) -> Result<Attempt, ApiError> {
        let response = self
            .authed(self.http.post(self.url("/attempt/start")))
            .json(&serde_json::json!({ "quizId": quiz_id }))
            .send()
            .await?;
        self.read_json(response).await
    }

    pub async fn save_answer(
        &self,
        attempt_id: &str,
        question_id: &str,
        selected_answer: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .authed(self.http.post(self.url("/attempt/save")))
            .json(&serde_json::json!({
                "attemptId": attempt_id,
                "questionId": question_id,
                "selectedAnswer": selected_answer,
            }))
            .send()
            .await?;
        self.read_empty(response).await
    }

    pub async fn submit_attempt(&self, attempt_id: &str) -> Result<(), ApiError> {
        let response = self
            .authed(self.http.post(self.url("/attempt/submit")))
            .json(&serde_json::json!({ "attemptId": attempt_id }))
            .send()
            .await?;
        self.read_empty(response).await
    }

    pub async fn attempt_detail(&self, attempt_id: &str) -> Result<AttemptResult, ApiError> {
        let response = self
            .authed(self.http.get(self.url(&format!("/attempt/{attempt_id}"))))
            .send()
            .await?;
        self.read_json(response).await
    }

    pub async fn my_attempts(&self) -> Result<Vec<Attempt>, ApiError> {
        let response = self.authed(self.http.get(self.url("/attempt/my-attempts"))).send().await?;
        let envelope: AttemptListEnvelope = self.read_json(response).await?;
        Ok(envelope.attempts)
    }

    /// Creator-only; 403 for anyone else.
    pub async fn submissions_for_quiz(&self, quiz_id: &str) -> Result<Vec<Attempt>, ApiError> {
        let response = self
            .authed(self.http.get(self.url(&format!("/attempt/submissions/{quiz_id}"))))
            .send()
            .await?;
        let envelope: AttemptListEnvelope = self.read_json(response).await?;
        Ok(envelope.attempts)
    }

    // Plumbing

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.tokens.load() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            return Err(self.status_error(status.as_u16(), &raw));
        }

        serde_json::from_str::<T>(&raw)
            .map_err(|err| ApiError::Decode(format!("{err}; body: {raw}")))
    }

    async fn read_empty(&self, response: Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let raw = response.text().await?;
        Err(self.status_error(status.as_u16(), &raw))
    }

    fn status_error(&self, status: u16, raw_body: &str) -> ApiError {
        let payload: Value = serde_json::from_str(raw_body).unwrap_or(Value::Null);
        let detail = extract_error_detail(&payload);

        match status {
            401 => {
                // Expired or revoked credential: invalidate tab-wide.
                self.tokens.clear();
                ApiError::Unauthorized
            }
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound(detail),
            status => {
                tracing::warn!(status, detail = %detail, "Backend request failed");
                ApiError::Backend { status, detail }
            }
        }
    }
}
