use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Durable storage for the opaque bearer credential. The token survives
/// restarts; the cached profile does not (see `SessionStore`).
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, token: &str);
    fn clear(&self);
}

/// File-backed store, the browser-localStorage analogue. Read failures are
/// treated as "no token"; write failures are logged and the session simply
/// won't survive a restart.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_string())
    }

    fn store(&self, token: &str) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = fs::create_dir_all(parent) {
                    tracing::warn!(
                        error = %err,
                        path = %parent.display(),
                        "Failed to create token directory"
                    );
                }
            }
        }

        if let Err(err) = fs::write(&self.path, token) {
            tracing::warn!(error = %err, path = %self.path.display(), "Failed to write token file");
            return;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            if let Err(err) = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)) {
                tracing::warn!(
                    error = %err,
                    path = %self.path.display(),
                    "Failed to set token file permissions"
                );
            }
        }
    }

    fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    error = %err,
                    path = %self.path.display(),
                    "Failed to remove token file"
                );
            }
        }
    }
}

/// In-memory store for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self { token: Mutex::new(Some(token.to_string())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|err| err.into_inner()).clone()
    }

    fn store(&self, token: &str) {
        *self.token.lock().unwrap_or_else(|err| err.into_inner()) = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.lock().unwrap_or_else(|err| err.into_inner()) = None;
    }
}
