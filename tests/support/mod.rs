#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Notify;

use susun_client::core::config::{
    AttemptSettings, BackendSettings, CatalogSettings, SessionSettings, Settings,
    TelemetrySettings,
};
use susun_client::session::token::MemoryTokenStore;
use susun_client::SusunClient;

pub const TOKEN: &str = "test-token";

/// Scriptable stand-in for the quiz backend, bound to an ephemeral local
/// port. State is seeded by each test; request counters let tests assert
/// which routes were hit and how often.
pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
}

#[derive(Default)]
pub struct BackendState {
    pub quizzes: Mutex<HashMap<String, Value>>,
    pub attempts: Mutex<HashMap<String, Value>>,
    /// Template for the attempt created by the start route.
    pub next_attempt: Mutex<Option<Value>>,
    pub catalog: Mutex<Value>,
    pub my_quizzes: Mutex<Value>,
    pub counters: Mutex<HashMap<String, u32>>,
    pub last_search: Mutex<Option<HashMap<String, String>>>,
    pub last_saved_quiz: Mutex<Option<Value>>,
    /// Fail this many submit calls with a 500 before succeeding.
    pub fail_submits: Mutex<u32>,
    /// When set, the submit handler parks until `release_submit` fires.
    pub hold_submit: AtomicBool,
    pub release_submit: Notify,
    pub forbid_submissions: AtomicBool,
}

impl BackendState {
    pub fn bump(&self, label: &str) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, label: &str) -> u32 {
        self.counters.lock().unwrap().get(label).copied().unwrap_or(0)
    }

    pub fn seed_quiz(&self, quiz: Value) {
        let id = quiz["_id"].as_str().expect("quiz _id").to_string();
        self.quizzes.lock().unwrap().insert(id, quiz);
    }

    pub fn seed_attempt(&self, attempt: Value) {
        let id = attempt["_id"].as_str().expect("attempt _id").to_string();
        self.attempts.lock().unwrap().insert(id, attempt);
    }
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState {
            catalog: Mutex::new(json!({ "quizzes": [], "totalPages": 1 })),
            my_quizzes: Mutex::new(json!({ "quizzes": [] })),
            ..BackendState::default()
        });

        let app = Router::new()
            .route("/auth/me", get(auth_me))
            .route("/quiz/all", get(quiz_all))
            .route("/quiz/my-quizzes", get(quiz_my))
            .route("/quiz/details/:id", get(quiz_get))
            .route("/quiz/edit/:id", put(quiz_edit))
            .route("/quiz/delete/:id", delete(quiz_delete))
            .route("/quiz/:id", get(quiz_get))
            .route("/attempt/start", post(attempt_start))
            .route("/attempt/save", post(attempt_save))
            .route("/attempt/submit", post(attempt_submit))
            .route("/attempt/my-attempts", get(my_attempts))
            .route("/attempt/quiz/:id", get(attempt_for_quiz))
            .route("/attempt/submissions/:id", get(submissions))
            .route("/attempt/:id", get(attempt_detail))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wired client with an in-memory token store already holding the
    /// backend's expected bearer token.
    pub fn client(&self) -> (SusunClient, Arc<MemoryTokenStore>) {
        self.client_with_token(Some(TOKEN))
    }

    pub fn client_with_token(
        &self,
        token: Option<&str>,
    ) -> (SusunClient, Arc<MemoryTokenStore>) {
        let settings = Settings::new(
            BackendSettings {
                base_url: self.base_url(),
                timeout_seconds: 5,
                connect_timeout_seconds: 5,
            },
            SessionSettings { token_path: PathBuf::from("/dev/null") },
            AttemptSettings { autosave_quiet_seconds: 1 },
            CatalogSettings { search_quiet_millis: 500, page_size: 6 },
            TelemetrySettings { log_level: "info".to_string(), json: false },
        )
        .expect("settings");

        let tokens = Arc::new(match token {
            Some(token) => MemoryTokenStore::with_token(token),
            None => MemoryTokenStore::new(),
        });
        let client = SusunClient::new(settings, tokens.clone()).expect("client");
        (client, tokens)
    }
}

pub fn sample_quiz(id: &str) -> Value {
    json!({
        "_id": id,
        "title": "Capitals",
        "description": "Capital cities",
        "category": ["General"],
        "coverImage": "",
        "questions": [
            {
                "_id": "q1",
                "type": "multiple-choice",
                "questionText": "Capital of Peru?",
                "options": ["Lima", "Quito"],
                "correctAnswer": "Lima"
            },
            {
                "_id": "q2",
                "type": "short-answer",
                "questionText": "Capital of France?",
                "correctAnswer": "Paris"
            }
        ],
        "timeLimit": 10,
        "dateOpens": "2025-03-01T00:00:00Z",
        "dateCloses": "2030-03-01T00:00:00Z",
        "published": true,
        "totalScore": 2.0
    })
}

pub fn sample_attempt(id: &str, quiz_id: &str, end_time: &str, answers: Value) -> Value {
    json!({
        "_id": id,
        "quizId": quiz_id,
        "userId": "user1",
        "userName": "Ada",
        "startTime": "2025-03-02T09:00:00Z",
        "endTime": end_time,
        "status": "in-progress",
        "answers": answers
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
}

async fn auth_me(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.bump("auth/me");
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "user": { "_id": "user1", "name": "Ada", "email": "ada@example.com" }
    }))
    .into_response()
}

async fn quiz_all(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.bump("quiz/all");
    *state.last_search.lock().unwrap() = Some(params);
    Json(state.catalog.lock().unwrap().clone()).into_response()
}

async fn quiz_my(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.bump("quiz/my-quizzes");
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(state.my_quizzes.lock().unwrap().clone()).into_response()
}

async fn quiz_get(State(state): State<Arc<BackendState>>, Path(id): Path<String>) -> Response {
    state.bump("quiz/get");
    match state.quizzes.lock().unwrap().get(&id) {
        Some(quiz) => Json(json!({ "quiz": quiz })).into_response(),
        None => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "Quiz not found" }))).into_response()
        }
    }
}

async fn quiz_edit(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.bump("quiz/edit");
    if !authorized(&headers) {
        return unauthorized();
    }
    state.quizzes.lock().unwrap().insert(id, body.clone());
    *state.last_saved_quiz.lock().unwrap() = Some(body);
    Json(json!({ "message": "Quiz updated" })).into_response()
}

async fn quiz_delete(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.bump("quiz/delete");
    if !authorized(&headers) {
        return unauthorized();
    }
    state.quizzes.lock().unwrap().remove(&id);
    Json(json!({ "message": "Quiz deleted" })).into_response()
}

async fn attempt_for_quiz(
    State(state): State<Arc<BackendState>>,
    Path(quiz_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.bump("attempt/for-quiz");
    if !authorized(&headers) {
        return unauthorized();
    }
    let attempts = state.attempts.lock().unwrap();
    let found = attempts
        .values()
        .find(|attempt| {
            attempt["quizId"] == quiz_id.as_str() && attempt["status"] == "in-progress"
        })
        .cloned();
    match found {
        Some(attempt) => Json(attempt).into_response(),
        None => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "No attempt found" }))).into_response()
        }
    }
}

async fn attempt_start(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.bump("attempt/start");
    if !authorized(&headers) {
        return unauthorized();
    }
    let Some(mut attempt) = state.next_attempt.lock().unwrap().take() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No attempt scripted" })),
        )
            .into_response();
    };
    attempt["quizId"] = body["quizId"].clone();
    state.seed_attempt(attempt.clone());
    Json(attempt).into_response()
}

async fn attempt_save(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let attempt_id = body["attemptId"].as_str().unwrap_or_default().to_string();
    let question_id = body["questionId"].as_str().unwrap_or_default().to_string();
    let selected = body["selectedAnswer"].clone();
    state.bump("attempt/save");
    state.bump(&format!("save:{question_id}"));

    let mut attempts = state.attempts.lock().unwrap();
    if let Some(attempt) = attempts.get_mut(&attempt_id) {
        let answers = attempt["answers"].as_array_mut().expect("answers array");
        if let Some(existing) =
            answers.iter_mut().find(|answer| answer["questionId"] == question_id.as_str())
        {
            existing["selectedAnswer"] = selected;
        } else {
            answers.push(json!({ "questionId": question_id, "selectedAnswer": selected }));
        }
    }
    Json(json!({ "message": "Answer saved" })).into_response()
}

async fn attempt_submit(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.hold_submit.load(Ordering::SeqCst) {
        state.release_submit.notified().await;
    }
    state.bump("attempt/submit");

    {
        let mut fail_submits = state.fail_submits.lock().unwrap();
        if *fail_submits > 0 {
            *fail_submits -= 1;
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Submission failed" })),
            )
                .into_response();
        }
    }

    let attempt_id = body["attemptId"].as_str().unwrap_or_default();
    let mut attempts = state.attempts.lock().unwrap();
    if let Some(attempt) = attempts.get_mut(attempt_id) {
        attempt["status"] = json!("submitted");
        attempt["score"] = json!(1.0);
    }
    Json(json!({ "message": "Attempt submitted" })).into_response()
}

async fn attempt_detail(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.bump("attempt/detail");
    if !authorized(&headers) {
        return unauthorized();
    }
    let attempts = state.attempts.lock().unwrap();
    let Some(attempt) = attempts.get(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Attempt not found" })))
            .into_response();
    };
    let quiz_id = attempt["quizId"].as_str().unwrap_or_default();
    let quiz = state.quizzes.lock().unwrap().get(quiz_id).cloned().unwrap_or(Value::Null);
    Json(json!({
        "attempt": attempt,
        "attemptedQuiz": quiz,
        "attemptorName": attempt["userName"]
    }))
    .into_response()
}

async fn my_attempts(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.bump("attempt/my-attempts");
    if !authorized(&headers) {
        return unauthorized();
    }
    let attempts: Vec<Value> = state.attempts.lock().unwrap().values().cloned().collect();
    Json(json!({ "attempts": attempts })).into_response()
}

async fn submissions(
    State(state): State<Arc<BackendState>>,
    Path(quiz_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.bump("attempt/submissions");
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.forbid_submissions.load(Ordering::SeqCst) {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": "Access denied" })))
            .into_response();
    }
    let attempts: Vec<Value> = state
        .attempts
        .lock()
        .unwrap()
        .values()
        .filter(|attempt| attempt["quizId"] == quiz_id.as_str())
        .cloned()
        .collect();
    Json(json!({ "attempts": attempts })).into_response()
}
