//! Headless client for the SusunSoal quiz platform.
//!
//! All business logic (scoring, persistence, access control, time windows)
//! lives in the backend; this crate is the state-synchronization layer a UI
//! drives: session/token handling, catalog search, quiz authoring, the timed
//! attempt session controller, and read-only result viewers.

pub mod attempt;
pub mod authoring;
pub mod catalog;
pub mod core;
pub mod http;
pub mod schemas;
pub mod session;
pub mod viewers;

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::core::config::Settings;
use crate::core::time::{Clock, SystemClock};
use crate::http::ApiClient;
use crate::session::token::{FileTokenStore, TokenStore};

pub use crate::attempt::{AttemptController, SessionEvent, SessionPhase};
pub use crate::authoring::QuizDraft;
pub use crate::catalog::{CatalogClient, SearchDebouncer};
pub use crate::core::telemetry::init_tracing;
pub use crate::http::ApiError;
pub use crate::session::SessionStore;

/// Composition root: one wired set of client components sharing a token
/// store and an HTTP client.
#[derive(Clone)]
pub struct SusunClient {
    inner: Arc<InnerClient>,
}

struct InnerClient {
    settings: Settings,
    api: ApiClient,
    session: SessionStore,
    catalog: CatalogClient,
    clock: Arc<dyn Clock>,
}

impl SusunClient {
    /// Load `.env` plus `SUSUN_*` environment settings and wire the client
    /// with the durable file-backed token store.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Settings::load()?;
        let tokens: Arc<dyn TokenStore> =
            Arc::new(FileTokenStore::new(settings.session().token_path.clone()));
        Self::new(settings, tokens)
    }

    pub fn new(settings: Settings, tokens: Arc<dyn TokenStore>) -> anyhow::Result<Self> {
        let api = ApiClient::from_settings(&settings, tokens.clone())?;
        let session = SessionStore::new(api.clone(), tokens);
        let catalog = CatalogClient::new(api.clone(), settings.catalog().page_size);

        Ok(Self {
            inner: Arc::new(InnerClient {
                settings,
                api,
                session,
                catalog,
                clock: Arc::new(SystemClock),
            }),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Fresh search-input gate armed with the configured quiet period.
    pub fn search_debouncer(&self) -> SearchDebouncer {
        SearchDebouncer::new(self.inner.settings.catalog().search_quiet())
    }

    /// Acquire (or resume) the attempt for a quiz and return the session
    /// controller plus its event stream.
    pub async fn begin_attempt(
        &self,
        quiz_id: &str,
    ) -> Result<(Arc<AttemptController>, UnboundedReceiver<SessionEvent>), ApiError> {
        AttemptController::acquire(
            self.inner.api.clone(),
            self.inner.clock.clone(),
            self.inner.settings.attempt().autosave_quiet(),
            quiz_id,
        )
        .await
    }
}
