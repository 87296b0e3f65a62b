use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    backend: BackendSettings,
    session: SessionSettings,
    attempt: AttemptSettings,
    catalog: CatalogSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub token_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AttemptSettings {
    pub autosave_quiet_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub search_quiet_millis: u64,
    pub page_size: u32,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl Settings {
    /// Assemble settings directly, bypassing the environment. Embedders
    /// and tests use this; `load()` is the env-driven path.
    pub fn new(
        backend: BackendSettings,
        session: SessionSettings,
        attempt: AttemptSettings,
        catalog: CatalogSettings,
        telemetry: TelemetrySettings,
    ) -> Result<Self, ConfigError> {
        let settings = Self { backend, session, attempt, catalog, telemetry };
        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, ConfigError> {
        let base_url = env_or_default("SUSUN_BACKEND_URL", "http://localhost:5000");
        let timeout_seconds =
            parse_u64("SUSUN_HTTP_TIMEOUT_SECONDS", env_or_default("SUSUN_HTTP_TIMEOUT_SECONDS", "30"))?;
        let connect_timeout_seconds = parse_u64(
            "SUSUN_CONNECT_TIMEOUT_SECONDS",
            env_or_default("SUSUN_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;

        let token_path = env_optional("SUSUN_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_token_path);

        let autosave_quiet_seconds = parse_u64(
            "SUSUN_AUTOSAVE_QUIET_SECONDS",
            env_or_default("SUSUN_AUTOSAVE_QUIET_SECONDS", "2"),
        )?;

        let search_quiet_millis = parse_u64(
            "SUSUN_SEARCH_QUIET_MILLIS",
            env_or_default("SUSUN_SEARCH_QUIET_MILLIS", "500"),
        )?;
        let page_size =
            parse_u32("SUSUN_CATALOG_PAGE_SIZE", env_or_default("SUSUN_CATALOG_PAGE_SIZE", "6"))?;

        let log_level = env_or_default("SUSUN_LOG_LEVEL", "info");
        let json = env_optional("SUSUN_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            backend: BackendSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout_seconds,
                connect_timeout_seconds,
            },
            session: SessionSettings { token_path },
            attempt: AttemptSettings { autosave_quiet_seconds },
            catalog: CatalogSettings { search_quiet_millis, page_size },
            telemetry: TelemetrySettings { log_level, json },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn backend(&self) -> &BackendSettings {
        &self.backend
    }

    pub fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub fn attempt(&self) -> &AttemptSettings {
        &self.attempt
    }

    pub fn catalog(&self) -> &CatalogSettings {
        &self.catalog
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "SUSUN_BACKEND_URL",
                value: String::from("<empty>"),
            });
        }
        if self.backend.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SUSUN_HTTP_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }
        if self.attempt.autosave_quiet_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SUSUN_AUTOSAVE_QUIET_SECONDS",
                value: "0".to_string(),
            });
        }
        if self.catalog.search_quiet_millis == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SUSUN_SEARCH_QUIET_MILLIS",
                value: "0".to_string(),
            });
        }
        if self.catalog.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SUSUN_CATALOG_PAGE_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}

impl AttemptSettings {
    pub fn autosave_quiet(&self) -> Duration {
        Duration::from_secs(self.autosave_quiet_seconds)
    }
}

impl CatalogSettings {
    pub fn search_quiet(&self) -> Duration {
        Duration::from_millis(self.search_quiet_millis)
    }
}

fn default_token_path() -> PathBuf {
    PathBuf::from(".susun_token")
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_u32(field: &'static str, value: String) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}
