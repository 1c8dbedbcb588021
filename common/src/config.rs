//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables (and a `.env`
//! file when present). Library crates never read it directly; the console binary
//! turns it into a `client::ClientConfig` at startup. Tests use the per-field
//! setters to override values.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    /// Backend origin, without the `/api` suffix.
    pub api_base: String,
    pub request_timeout_secs: u64,
    /// Where the access/refresh token pair is persisted between runs.
    pub session_file: String,
    /// Page size used when loading the whole student directory.
    pub student_page_size: u32,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Every value has a default; with no environment set the console talks to
    /// a backend on `localhost:8000`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: var_or("APP_ENV", "development"),
            project_name: var_or("PROJECT_NAME", "backoffice-console"),
            api_base: var_or("API_BASE", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
            request_timeout_secs: parsed_or("REQUEST_TIMEOUT_SECS", 30),
            session_file: var_or("SESSION_FILE", "session.json"),
            student_page_size: parsed_or("STUDENT_PAGE_SIZE", 1000),
            log_level: var_or("LOG_LEVEL", "info"),
            log_file: var_or("LOG_FILE", "console.log"),
            log_to_stdout: var_or("LOG_TO_STDOUT", "false") == "true",
        }
    }

    fn lock() -> &'static RwLock<AppConfig> {
        CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()))
    }

    /// Returns a snapshot of the global configuration.
    pub fn global() -> AppConfig {
        Self::lock()
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        let mut guard = Self::lock()
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = AppConfig::from_env();
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = Self::lock()
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_api_base(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.api_base = value.into().trim_end_matches('/').to_string());
    }

    pub fn set_request_timeout_secs(value: u64) {
        AppConfig::set_field(|cfg| cfg.request_timeout_secs = value);
    }

    pub fn set_session_file(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.session_file = value.into());
    }

    pub fn set_student_page_size(value: u32) {
        AppConfig::set_field(|cfg| cfg.student_page_size = value);
    }

    pub fn set_log_level(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_log_file(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_file = value.into());
    }

    pub fn set_log_to_stdout(value: bool) {
        AppConfig::set_field(|cfg| cfg.log_to_stdout = value);
    }
}
