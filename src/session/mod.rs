pub mod token;

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::http::{ApiClient, ApiError};
use crate::schemas::User;
use crate::session::token::TokenStore;

/// Tab-wide session state: the persisted credential token plus a volatile
/// profile cache keyed by the token it was fetched under. Routing decisions
/// (where to send an unauthenticated user) belong to callers; the store
/// only resolves identity and hands out URL builders.
pub struct SessionStore {
    api: ApiClient,
    tokens: Arc<dyn TokenStore>,
    profile: Mutex<Option<CachedProfile>>,
    tx: watch::Sender<Option<User>>,
}

#[derive(Clone)]
struct CachedProfile {
    token: String,
    user: User,
}

impl SessionStore {
    pub fn new(api: ApiClient, tokens: Arc<dyn TokenStore>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { api, tokens, profile: Mutex::new(None), tx }
    }

    /// Resolve the current user. No token resolves to `Ok(None)`, not an
    /// error; a rejected token (401) clears both the token and the cache
    /// and also resolves to `Ok(None)`.
    pub async fn current_user(&self) -> Result<Option<User>, ApiError> {
        let Some(token) = self.tokens.load() else {
            self.drop_cache();
            return Ok(None);
        };

        if let Some(cached) = self.cached_for(&token) {
            return Ok(Some(cached));
        }

        match self.api.me().await {
            Ok(user) => {
                self.cache(token, user.clone());
                Ok(Some(user))
            }
            Err(ApiError::Unauthorized) => {
                // ApiClient already cleared the token store.
                self.drop_cache();
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Clears token and cached profile synchronously and notifies
    /// subscribers.
    pub fn logout(&self) {
        self.tokens.clear();
        self.drop_cache();
        tracing::info!("Session cleared");
    }

    /// Persist the token handed back by the auth callback.
    pub fn complete_login(&self, token: &str) {
        self.tokens.store(token);
        self.drop_cache();
    }

    /// Observe login/logout transitions.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.tx.subscribe()
    }

    /// Backend auth entry, with the original destination riding along.
    pub fn login_url(&self, callback: &str) -> String {
        self.api.login_url(callback)
    }

    /// Local login route carrying the interrupted destination.
    pub fn login_redirect(path: &str) -> String {
        let mut redirect = String::from("/login");
        if let Ok(mut url) = reqwest::Url::parse("http://localhost/login") {
            url.query_pairs_mut().append_pair("callback", path);
            if let Some(query) = url.query() {
                redirect = format!("/login?{query}");
            }
        }
        redirect
    }

    fn cached_for(&self, token: &str) -> Option<User> {
        let cache = self.profile.lock().unwrap_or_else(|err| err.into_inner());
        cache.as_ref().filter(|cached| cached.token == token).map(|cached| cached.user.clone())
    }

    fn cache(&self, token: String, user: User) {
        let mut cache = self.profile.lock().unwrap_or_else(|err| err.into_inner());
        *cache = Some(CachedProfile { token, user: user.clone() });
        drop(cache);
        let _ = self.tx.send(Some(user));
    }

    fn drop_cache(&self) {
        let mut cache = self.profile.lock().unwrap_or_else(|err| err.into_inner());
        let had_profile = cache.take().is_some();
        drop(cache);
        if had_profile || self.tokens.load().is_none() {
            let _ = self.tx.send(None);
        }
    }
}
