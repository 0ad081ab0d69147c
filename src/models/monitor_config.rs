use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DATABASE_FILE_NAME, DEFAULT_CACHE_EXPIRY_SECS, DEFAULT_METADATA_EXPIRY_HOURS, DEFAULT_PORT,
    DEFAULT_REFRESH_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WORKER_COUNT,
};
use crate::models::NumberLocale;
use crate::utils::{env_or, get_data_dir};

/// Saturates instead of overflowing on absurd environment values
fn hours(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(3600))
}

/// Runtime configuration for the monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Delay between refresh ticks
    pub refresh_interval: Duration,

    /// Maximum age of a cached quote
    pub cache_expiry: Duration,

    /// Maximum age of the metadata database before it is reported as outdated
    pub metadata_expiry: Duration,

    /// Concurrent provider requests per batch
    pub worker_count: usize,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Directory holding the metadata database
    pub data_dir: PathBuf,

    /// Optional best-effort watchlist snapshot
    pub watchlist_file: Option<PathBuf>,

    pub locale: NumberLocale,

    pub port: u16,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            cache_expiry: Duration::from_secs(DEFAULT_CACHE_EXPIRY_SECS),
            metadata_expiry: hours(DEFAULT_METADATA_EXPIRY_HOURS),
            worker_count: DEFAULT_WORKER_COUNT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            data_dir: PathBuf::from("data"),
            watchlist_file: None,
            locale: NumberLocale::default(),
            port: DEFAULT_PORT,
        }
    }
}

impl MonitorConfig {
    /// Load from `B3_*` environment variables, keeping defaults for anything unset or invalid
    pub fn from_env() -> Self {
        let locale = match std::env::var("B3_LOCALE") {
            Ok(raw) => NumberLocale::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default locale");
                NumberLocale::default()
            }),
            Err(_) => NumberLocale::default(),
        };

        Self {
            refresh_interval: Duration::from_secs(env_or("B3_REFRESH_SECS", DEFAULT_REFRESH_SECS).max(1)),
            cache_expiry: Duration::from_secs(env_or("B3_CACHE_EXPIRY_SECS", DEFAULT_CACHE_EXPIRY_SECS)),
            metadata_expiry: hours(env_or("B3_METADATA_EXPIRY_HOURS", DEFAULT_METADATA_EXPIRY_HOURS)),
            worker_count: env_or("B3_WORKER_COUNT", DEFAULT_WORKER_COUNT).max(1),
            request_timeout: Duration::from_secs(
                env_or("B3_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS).max(1),
            ),
            data_dir: get_data_dir(),
            watchlist_file: std::env::var("B3_WATCHLIST_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            locale,
            port: env_or("PORT", DEFAULT_PORT),
        }
    }

    /// Path of the metadata database JSON document
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }

    pub fn cache_expiry_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.cache_expiry).unwrap_or_else(|_| chrono::Duration::seconds(30))
    }

    pub fn metadata_expiry_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.metadata_expiry).unwrap_or_else(|_| chrono::Duration::hours(24))
    }
}
