use std::time::Duration;

use time::OffsetDateTime;

use crate::http::{ApiClient, ApiError, QuizPage};

/// Pure request/response search over the published-quiz catalog. Pagination
/// is 1-indexed; page 1 of an empty catalog is a valid request that yields
/// an empty page with `total_pages == 1`.
#[derive(Clone)]
pub struct CatalogClient {
    api: ApiClient,
    page_size: u32,
}

impl CatalogClient {
    pub fn new(api: ApiClient, page_size: u32) -> Self {
        Self { api, page_size }
    }

    pub async fn search(
        &self,
        query: &str,
        category: &str,
        page: u32,
    ) -> Result<QuizPage, ApiError> {
        self.search_with_page_size(query, category, page, self.page_size).await
    }

    pub async fn search_with_page_size(
        &self,
        query: &str,
        category: &str,
        page: u32,
        page_size: u32,
    ) -> Result<QuizPage, ApiError> {
        self.api.search_quizzes(query, category, page.max(1), page_size).await
    }
}

/// Search parameters as the user last typed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchInput {
    pub query: String,
    pub category: String,
    pub page: u32,
}

/// Quiet-period gate for bursty search input: every keystroke re-arms the
/// deadline and only the latest input survives, so one request is issued
/// per quiet period. Time comes in from the caller, which keeps the gate
/// testable without timers.
#[derive(Debug)]
pub struct SearchDebouncer {
    quiet: Duration,
    pending: Option<(SearchInput, OffsetDateTime)>,
}

impl SearchDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, pending: None }
    }

    pub fn poke(&mut self, input: SearchInput, now: OffsetDateTime) {
        self.pending = Some((input, now + self.quiet));
    }

    /// Take the settled input once its quiet period has elapsed.
    pub fn take_ready(&mut self, now: OffsetDateTime) -> Option<SearchInput> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.pending.take().map(|(input, _)| input),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }
}
