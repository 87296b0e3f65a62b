use serde_json::Value;
use thiserror::Error;

/// Client-side taxonomy of backend failures. Authorization (403) is kept
/// distinct from not-found; 404 doubles as the "create a new attempt"
/// signal during attempt acquisition.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,
    #[error("access denied")]
    Forbidden,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend error (status {status}): {detail}")]
    Backend { status: u16, detail: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Safe to retry without corrupting local state: transport failures and
    /// server-side 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Pull a human-readable detail out of whatever error body the backend
/// produced; shapes vary across routes.
pub(crate) fn extract_error_detail(payload: &Value) -> String {
    for key in ["error", "message", "detail"] {
        if let Some(text) = payload.get(key).and_then(Value::as_str) {
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }

    "unknown_error".to_string()
}
