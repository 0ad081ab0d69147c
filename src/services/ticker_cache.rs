//! Expiry-based quote cache
//!
//! Entries younger than the expiry window are served as-is. Misses and stale entries
//! go through the batch fetcher under a single-writer gate, so two concurrent callers
//! never fetch the same ticker twice.
//!
//! Failures are not cached: a ticker with no usable snapshot is retried on the very
//! next call. A failed refetch never replaces a still-fresh snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::models::{QuoteBatch, QuoteOutcome, TickerSnapshot};
use crate::services::batch_fetcher::BatchFetcher;

pub type SharedTickerCache = Arc<TickerCache>;

pub struct TickerCache {
    entries: RwLock<HashMap<String, TickerSnapshot>>,
    fetch_gate: Mutex<()>,
    fetcher: BatchFetcher,
    expiry: Duration,
}

impl TickerCache {
    pub fn new(fetcher: BatchFetcher, expiry: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            fetch_gate: Mutex::new(()),
            fetcher,
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub async fn get(&self, ticker: &str) -> QuoteOutcome {
        self.get_at(ticker, Utc::now()).await
    }

    pub async fn get_at(&self, ticker: &str, now: DateTime<Utc>) -> QuoteOutcome {
        let key = ticker.to_string();
        let mut batch = self.get_many_at(std::slice::from_ref(&key), now).await;
        batch
            .remove(&key)
            .unwrap_or_else(|| Err(FetchError::ProviderUnavailable(format!("no outcome for {}", ticker))))
    }

    pub async fn get_many(&self, tickers: &[String]) -> QuoteBatch {
        self.get_many_at(tickers, Utc::now()).await
    }

    /// Serve fresh entries, fetch the rest in one batch
    pub async fn get_many_at(&self, tickers: &[String], now: DateTime<Utc>) -> QuoteBatch {
        let mut outcomes = QuoteBatch::with_capacity(tickers.len());
        let mut misses = self.collect_fresh(tickers, now, &mut outcomes).await;
        if misses.is_empty() {
            return outcomes;
        }

        let _gate = self.fetch_gate.lock().await;

        // Another writer may have filled some misses while we waited for the gate
        misses = self.collect_fresh(&misses, now, &mut outcomes).await;
        if misses.is_empty() {
            return outcomes;
        }

        debug!(misses = misses.len(), "Fetching stale or missing tickers");
        let fetched = self.fetcher.fetch_many(&misses, now).await;
        self.store(fetched, now, &mut outcomes).await;
        outcomes
    }

    pub async fn refresh(&self, tickers: &[String]) -> QuoteBatch {
        self.refresh_at(tickers, Utc::now()).await
    }

    /// Refetch every ticker regardless of age
    pub async fn refresh_at(&self, tickers: &[String], now: DateTime<Utc>) -> QuoteBatch {
        let mut outcomes = QuoteBatch::with_capacity(tickers.len());
        if tickers.is_empty() {
            return outcomes;
        }

        let _gate = self.fetch_gate.lock().await;
        let fetched = self.fetcher.fetch_many(tickers, now).await;
        self.store(fetched, now, &mut outcomes).await;
        outcomes
    }

    /// Cached snapshot regardless of age, without fetching
    pub async fn peek(&self, ticker: &str) -> Option<TickerSnapshot> {
        self.entries.read().await.get(ticker).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Move fresh hits into `outcomes` and return the tickers that need a fetch
    async fn collect_fresh(
        &self,
        tickers: &[String],
        now: DateTime<Utc>,
        outcomes: &mut QuoteBatch,
    ) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut misses = Vec::new();

        for ticker in tickers {
            if outcomes.contains_key(ticker) {
                continue;
            }
            match entries.get(ticker) {
                Some(snapshot) if snapshot.is_fresh(now, self.expiry) => {
                    outcomes.insert(ticker.clone(), Ok(snapshot.clone()));
                }
                _ => {
                    if !misses.contains(ticker) {
                        misses.push(ticker.clone());
                    }
                }
            }
        }

        misses
    }

    async fn store(&self, fetched: QuoteBatch, now: DateTime<Utc>, outcomes: &mut QuoteBatch) {
        let mut entries = self.entries.write().await;

        for (ticker, result) in fetched {
            match result {
                Ok(snapshot) => {
                    let snapshot = TickerSnapshot {
                        fetched_at: now,
                        ..snapshot
                    };
                    entries.insert(ticker.clone(), snapshot.clone());
                    outcomes.insert(ticker, Ok(snapshot));
                }
                Err(e) => match entries.get(&ticker) {
                    Some(prior) if prior.is_fresh(now, self.expiry) => {
                        debug!(ticker = %ticker, error = %e, "Refetch failed, keeping fresh snapshot");
                        outcomes.insert(ticker, Ok(prior.clone()));
                    }
                    _ => {
                        // Failures stay uncached, so the next call retries immediately
                        warn!(ticker = %ticker, error = %e, "Quote unavailable, will retry on next request");
                        outcomes.insert(ticker, Err(e));
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::testing::{FakeProvider, Script};
    use chrono::TimeZone;
    use std::time::Duration as StdDuration;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn cache_with(provider: Arc<FakeProvider>) -> TickerCache {
        let fetcher = BatchFetcher::new(provider, 5, StdDuration::from_secs(5));
        TickerCache::new(fetcher, Duration::seconds(30))
    }

    #[tokio::test]
    async fn test_hit_within_expiry_returns_identical_snapshot() {
        let provider = Arc::new(FakeProvider::new().quote("PETR4.SA", 38.5, 38.0));
        let cache = cache_with(provider.clone());

        let first = cache.get_at("PETR4.SA", at(0)).await.unwrap();
        let second = cache.get_at("PETR4.SA", at(0)).await.unwrap();
        let third = cache.get_at("PETR4.SA", at(29)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(provider.calls_for("PETR4.SA"), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched_once() {
        let provider = Arc::new(FakeProvider::new().quote("PETR4.SA", 38.5, 38.0));
        let cache = cache_with(provider.clone());

        cache.get_at("PETR4.SA", at(0)).await.unwrap();
        provider.set("PETR4.SA", Script::Quote { price: 39.0, previous_close: 38.0 });

        let refreshed = cache.get_at("PETR4.SA", at(30)).await.unwrap();
        assert_eq!(refreshed.price, 39.0);
        assert_eq!(refreshed.fetched_at, at(30));
        assert_eq!(provider.calls_for("PETR4.SA"), 2);

        cache.get_at("PETR4.SA", at(31)).await.unwrap();
        assert_eq!(provider.calls_for("PETR4.SA"), 2);
    }

    #[tokio::test]
    async fn test_failure_without_prior_is_not_cached() {
        let provider = Arc::new(
            FakeProvider::new().failing("VALE3.SA", FetchError::ProviderUnavailable("down".into())),
        );
        let cache = cache_with(provider.clone());

        let first = cache.get_at("VALE3.SA", at(0)).await;
        assert!(matches!(first, Err(FetchError::ProviderUnavailable(_))));
        assert!(cache.is_empty().await);

        // Retried immediately, not after the expiry window
        let _ = cache.get_at("VALE3.SA", at(1)).await;
        assert_eq!(provider.calls_for("VALE3.SA"), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_fresh_prior() {
        let provider = Arc::new(FakeProvider::new().quote("ITUB4.SA", 30.0, 29.0));
        let cache = cache_with(provider.clone());

        let prior = cache.get_at("ITUB4.SA", at(0)).await.unwrap();
        provider.set("ITUB4.SA", Script::Fail(FetchError::ProviderUnavailable("timeout".into())));

        let tickers = vec!["ITUB4.SA".to_string()];
        let batch = cache.refresh_at(&tickers, at(10)).await;

        assert_eq!(batch["ITUB4.SA"].as_ref().unwrap(), &prior);
        assert_eq!(cache.peek("ITUB4.SA").await.unwrap(), prior);
    }

    #[tokio::test]
    async fn test_failed_refetch_of_stale_entry_returns_failure() {
        let provider = Arc::new(FakeProvider::new().quote("ITUB4.SA", 30.0, 29.0));
        let cache = cache_with(provider.clone());

        let prior = cache.get_at("ITUB4.SA", at(0)).await.unwrap();
        provider.set("ITUB4.SA", Script::Fail(FetchError::MalformedResponse("shape".into())));

        let outcome = cache.get_at("ITUB4.SA", at(45)).await;
        assert!(matches!(outcome, Err(FetchError::MalformedResponse(_))));
        // Stale entry is left in place but not served
        assert_eq!(cache.peek("ITUB4.SA").await.unwrap(), prior);
    }

    #[tokio::test]
    async fn test_get_many_mixes_hits_and_misses() {
        let provider = Arc::new(
            FakeProvider::new()
                .quote("AAAA3.SA", 1.0, 1.0)
                .failing("BBBB3.SA", FetchError::UnknownTicker("BBBB3.SA".into()))
                .quote("CCCC3.SA", 3.0, 2.0),
        );
        let cache = cache_with(provider.clone());
        cache.get_at("AAAA3.SA", at(0)).await.unwrap();

        let tickers: Vec<String> = ["AAAA3.SA", "BBBB3.SA", "CCCC3.SA"].iter().map(|s| s.to_string()).collect();
        let batch = cache.get_many_at(&tickers, at(5)).await;

        assert_eq!(batch.len(), 3);
        assert!(batch["AAAA3.SA"].is_ok());
        assert!(batch["BBBB3.SA"].is_err());
        assert!(batch["CCCC3.SA"].is_ok());
        assert_eq!(provider.calls_for("AAAA3.SA"), 1);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_fetch_once() {
        let provider = Arc::new(FakeProvider::new().quote("WEGE3.SA", 50.0, 49.0));
        let cache = Arc::new(cache_with(provider.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.get_at("WEGE3.SA", at(0)).await }));
        }
        for result in futures::future::join_all(handles).await {
            assert!(result.unwrap().is_ok());
        }

        assert_eq!(provider.calls_for("WEGE3.SA"), 1);
    }
}
