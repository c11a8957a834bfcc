//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    /// Directory holding one `course_<id>.cached` blob per course.
    pub cache_root: String,
    /// Directory holding the raw JSON dumps produced by the page scraper.
    pub source_root: String,
    /// Number of upstream fetches allowed to run at the same time.
    pub fetch_workers: usize,
    /// Course used when the command line does not name one.
    pub course_id: String,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Every value has a default; malformed numbers fall back to it.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "learnit-tables".into()),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "learnit=info,tables=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "learnit.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            cache_root: env::var("CACHE_ROOT").unwrap_or_else(|_| "data/cache".into()),
            source_root: env::var("SOURCE_ROOT").unwrap_or_else(|_| "data/source".into()),
            fetch_workers: parsed_or("FETCH_WORKERS", 4usize).max(1),
            course_id: env::var("COURSE_ID").unwrap_or_default(),
        }
    }

    fn instance() -> &'static RwLock<AppConfig> {
        CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()))
    }

    /// Returns a snapshot of the global configuration.
    ///
    /// A poisoned lock still yields the last written value.
    pub fn global() -> AppConfig {
        match Self::instance().read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        Self::set_field(|cfg| *cfg = AppConfig::from_env());
    }

    /// Generic internal setter for any field in the config.
    ///
    /// Used by public per-field setter methods.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = match Self::instance().write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_log_level(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_cache_root(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.cache_root = value.into());
    }

    pub fn set_source_root(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.source_root = value.into());
    }

    /// Override the fetch pool size. Zero is clamped to one.
    pub fn set_fetch_workers(value: usize) {
        AppConfig::set_field(|cfg| cfg.fetch_workers = value.max(1));
    }

    pub fn set_course_id(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.course_id = value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn setters_override_and_reset_restores() {
        unsafe {
            env::remove_var("FETCH_WORKERS");
        }
        AppConfig::reset();
        assert_eq!(AppConfig::global().fetch_workers, 4);

        AppConfig::set_fetch_workers(0);
        assert_eq!(AppConfig::global().fetch_workers, 1);

        AppConfig::set_cache_root("/tmp/somewhere");
        assert_eq!(AppConfig::global().cache_root, "/tmp/somewhere");

        AppConfig::set_log_level("tables=trace");
        assert_eq!(AppConfig::global().log_level, "tables=trace");

        AppConfig::reset();
        assert_eq!(AppConfig::global().fetch_workers, 4);
        assert_ne!(AppConfig::global().cache_root, "/tmp/somewhere");
        assert_ne!(AppConfig::global().log_level, "tables=trace");
    }

    #[test]
    #[serial]
    fn malformed_worker_count_falls_back_to_default() {
        unsafe {
            env::set_var("FETCH_WORKERS", "lots");
        }
        AppConfig::reset();
        assert_eq!(AppConfig::global().fetch_workers, 4);

        unsafe {
            env::set_var("FETCH_WORKERS", " 7 ");
        }
        AppConfig::reset();
        assert_eq!(AppConfig::global().fetch_workers, 7);

        unsafe {
            env::remove_var("FETCH_WORKERS");
        }
        AppConfig::reset();
    }
}
