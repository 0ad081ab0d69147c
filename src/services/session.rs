//! Session state: watchlist, refresh settings and pending UI notices
//!
//! One `SessionContext` is shared by the HTTP handlers and the refresh worker
//! through [`SharedSession`]. The optional watchlist snapshot is best-effort:
//! read and write failures are logged and never surface to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::constants::{DEFAULT_WATCHLIST, REFRESH_INTERVAL_CHOICES};
use crate::error::{AppError, FetchError, Result};
use crate::models::watchlist::normalize_ticker;
use crate::models::{WatchlistError, WatchlistState};
use crate::services::ticker_cache::TickerCache;
use crate::utils::write_json_atomic;

pub type SharedSession = Arc<RwLock<SessionContext>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshSettings {
    pub interval_secs: u64,
    pub auto_refresh: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: REFRESH_INTERVAL_CHOICES[0],
            auto_refresh: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// One-shot message shown on the next page render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Watchlist file layout
#[derive(Debug, Serialize, Deserialize)]
struct WatchlistSnapshot {
    watched_stocks: Vec<String>,
    #[serde(default)]
    last_updated: Option<String>,
}

#[derive(Debug)]
pub struct SessionContext {
    watchlist: WatchlistState,
    settings: RefreshSettings,
    last_update: Option<DateTime<Utc>>,
    notices: Vec<Notice>,
    /// Watchlist or settings changed since the last tick
    dirty: bool,
    snapshot_path: Option<PathBuf>,
}

impl SessionContext {
    /// Session with the default watchlist and no snapshot file
    pub fn new(settings: RefreshSettings) -> Self {
        Self {
            watchlist: WatchlistState::from_tickers(DEFAULT_WATCHLIST),
            settings,
            last_update: None,
            notices: Vec::new(),
            dirty: true,
            snapshot_path: None,
        }
    }

    /// Session backed by a watchlist snapshot; a missing or unreadable file yields the defaults
    pub fn with_snapshot(settings: RefreshSettings, path: PathBuf) -> Self {
        let mut session = Self::new(settings);
        if let Some(watchlist) = load_snapshot(&path) {
            session.watchlist = watchlist;
        }
        session.snapshot_path = Some(path);
        session
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn watchlist(&self) -> &WatchlistState {
        &self.watchlist
    }

    pub fn tickers(&self) -> Vec<String> {
        self.watchlist.tickers().to_vec()
    }

    pub fn add_ticker(&mut self, raw: &str) -> std::result::Result<String, WatchlistError> {
        let ticker = self.watchlist.add(raw)?;
        self.dirty = true;
        self.persist();
        Ok(ticker)
    }

    /// No-op when absent; returns whether the ticker was removed
    pub fn remove_ticker(&mut self, raw: &str) -> bool {
        let removed = self.watchlist.remove(raw);
        if removed {
            self.dirty = true;
            self.persist();
        }
        removed
    }

    pub fn settings(&self) -> RefreshSettings {
        self.settings
    }

    pub fn set_refresh_interval(&mut self, secs: u64) -> Result<()> {
        if !REFRESH_INTERVAL_CHOICES.contains(&secs) {
            return Err(AppError::InvalidInput(format!(
                "Refresh interval must be one of {:?} seconds, got {}",
                REFRESH_INTERVAL_CHOICES, secs
            )));
        }
        self.settings.interval_secs = secs;
        self.dirty = true;
        Ok(())
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        self.settings.auto_refresh = enabled;
        self.dirty = true;
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn mark_updated(&mut self, at: DateTime<Utc>) {
        self.last_update = Some(at);
    }

    pub fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Returns and clears the changed-since-last-tick flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    fn persist(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let snapshot = WatchlistSnapshot {
            watched_stocks: self.tickers(),
            last_updated: Some(Utc::now().to_rfc3339()),
        };
        if let Err(e) = write_json_atomic(path, &snapshot) {
            warn!(path = %path.display(), error = %e, "Could not save watchlist");
        }
    }
}

fn load_snapshot(path: &Path) -> Option<WatchlistState> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read watchlist, using defaults");
            return None;
        }
    };

    match serde_json::from_str::<WatchlistSnapshot>(&contents) {
        Ok(snapshot) => {
            let watchlist = WatchlistState::from_tickers(&snapshot.watched_stocks);
            info!(path = %path.display(), tickers = watchlist.len(), "Loaded watchlist");
            Some(watchlist)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Watchlist file is corrupt, using defaults");
            None
        }
    }
}

/// Validate `raw`, check it against the provider, then add it to the session watchlist.
///
/// Only an `UnknownTicker` answer rejects the ticker; an unreachable provider does
/// not block adding a well-formed code.
pub async fn add_verified(
    session: &SharedSession,
    cache: &TickerCache,
    raw: &str,
) -> std::result::Result<String, WatchlistError> {
    let ticker = normalize_ticker(raw);
    {
        // Validate before spending a provider call
        let mut preview = session.read().await.watchlist().clone();
        preview.add(&ticker)?;
    }

    match cache.get(&ticker).await {
        Err(FetchError::UnknownTicker(_)) => return Err(WatchlistError::UnknownTicker(ticker)),
        Err(e) => warn!(ticker = %ticker, error = %e, "Provider check failed, adding ticker anyway"),
        Ok(_) => {}
    }

    session.write().await.add_ticker(&ticker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::batch_fetcher::BatchFetcher;
    use crate::services::provider::testing::FakeProvider;
    use std::time::Duration;

    fn cache_with(provider: FakeProvider) -> TickerCache {
        let fetcher = BatchFetcher::new(Arc::new(provider), 2, Duration::from_secs(5));
        TickerCache::new(fetcher, chrono::Duration::seconds(30))
    }

    #[test]
    fn test_new_session_defaults() {
        let mut session = SessionContext::new(RefreshSettings::default());
        assert_eq!(session.tickers(), DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        assert_eq!(session.settings().interval_secs, 2);
        assert!(session.last_update().is_none());
        assert!(session.take_dirty());
        assert!(!session.take_dirty());
    }

    #[test]
    fn test_refresh_interval_choices() {
        let mut session = SessionContext::new(RefreshSettings::default());
        session.set_refresh_interval(30).unwrap();
        assert_eq!(session.settings().interval_secs, 30);
        assert!(matches!(session.set_refresh_interval(7), Err(AppError::InvalidInput(_))));
        assert_eq!(session.settings().interval_secs, 30);
    }

    #[test]
    fn test_notices_are_taken_once() {
        let mut session = SessionContext::new(RefreshSettings::default());
        session.push_notice(NoticeLevel::Success, "ok");
        assert_eq!(session.take_notices().len(), 1);
        assert!(session.take_notices().is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");

        let mut session = SessionContext::with_snapshot(RefreshSettings::default(), path.clone());
        session.add_ticker("wege3.sa").unwrap();
        session.remove_ticker("ABEV3.SA");

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["watched_stocks"].as_array().unwrap().len(), 5);
        assert!(json["last_updated"].is_string());

        let reloaded = SessionContext::with_snapshot(RefreshSettings::default(), path);
        assert_eq!(reloaded.tickers(), session.tickers());
        assert_eq!(reloaded.tickers().last().map(String::as_str), Some("WEGE3.SA"));
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let session = SessionContext::with_snapshot(RefreshSettings::default(), path);
        assert_eq!(session.watchlist().len(), DEFAULT_WATCHLIST.len());
    }

    #[tokio::test]
    async fn test_add_verified() {
        let cache = cache_with(
            FakeProvider::new()
                .quote("WEGE3.SA", 50.0, 49.0)
                .failing("RENT3.SA", FetchError::ProviderUnavailable("down".into())),
        );
        let session = SessionContext::new(RefreshSettings::default()).into_shared();

        assert_eq!(add_verified(&session, &cache, " wege3.sa").await, Ok("WEGE3.SA".to_string()));
        assert_eq!(add_verified(&session, &cache, "RENT3.SA").await, Ok("RENT3.SA".to_string()));
        assert_eq!(
            add_verified(&session, &cache, "ZZZZ3.SA").await,
            Err(WatchlistError::UnknownTicker("ZZZZ3.SA".to_string()))
        );
        assert!(matches!(
            add_verified(&session, &cache, "PETR4.SA").await,
            Err(WatchlistError::Duplicate(_))
        ));
        assert!(matches!(
            add_verified(&session, &cache, "AAPL").await,
            Err(WatchlistError::InvalidFormat(_))
        ));

        assert_eq!(session.read().await.watchlist().len(), DEFAULT_WATCHLIST.len() + 2);
    }
}
