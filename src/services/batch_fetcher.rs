use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::models::QuoteBatch;
use crate::services::provider::QuoteProvider;

/// Concurrent quote fetcher with a bounded worker count and per-request timeout
#[derive(Clone)]
pub struct BatchFetcher {
    provider: Arc<dyn QuoteProvider>,
    worker_count: usize,
    request_timeout: Duration,
}

impl BatchFetcher {
    pub fn new(provider: Arc<dyn QuoteProvider>, worker_count: usize, request_timeout: Duration) -> Self {
        Self {
            provider,
            worker_count: worker_count.max(1),
            request_timeout,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Fetch every ticker, returning exactly one outcome per distinct input ticker.
    ///
    /// A failing, timed-out or panicking request only affects its own ticker.
    pub async fn fetch_many(&self, tickers: &[String], now: DateTime<Utc>) -> QuoteBatch {
        let provider = self.provider.clone();
        let batch = run_bounded(
            tickers,
            self.worker_count,
            self.request_timeout,
            move |ticker| {
                let provider = provider.clone();
                async move { provider.fetch_quote(&ticker, now).await }
            },
        )
        .await;

        let failed = batch.values().filter(|r| r.is_err()).count();
        info!(
            tickers = batch.len(),
            failed,
            workers = self.worker_count,
            "Batch fetch completed"
        );
        batch
    }
}

/// Run `task` for every distinct key in groups of `worker_count` concurrent tasks.
///
/// Each task gets its own timeout; a timeout or a join error becomes
/// `ProviderUnavailable` for that key without touching the others.
pub async fn run_bounded<T, F, Fut>(
    keys: &[String],
    worker_count: usize,
    request_timeout: Duration,
    task: F,
) -> HashMap<String, Result<T, FetchError>>
where
    T: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    let mut seen = HashSet::new();
    let unique: Vec<String> = keys
        .iter()
        .filter(|k| seen.insert(k.as_str()))
        .cloned()
        .collect();

    let mut results = HashMap::with_capacity(unique.len());
    let worker_count = worker_count.max(1);
    let total_groups = unique.len().div_ceil(worker_count);

    for (group_idx, group) in unique.chunks(worker_count).enumerate() {
        let mut handles = Vec::with_capacity(group.len());

        for key in group {
            let fut = task(key.clone());
            handles.push(tokio::spawn(async move {
                match tokio::time::timeout(request_timeout, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::ProviderUnavailable(format!(
                        "request timed out after {}s",
                        request_timeout.as_secs_f64()
                    ))),
                }
            }));
        }

        let outcomes = futures::future::join_all(handles).await;

        for (key, outcome) in group.iter().zip(outcomes) {
            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    warn!(key = %key, error = %e, "Fetch task join error");
                    Err(FetchError::ProviderUnavailable(format!("fetch task failed: {}", e)))
                }
            };
            if let Err(e) = &result {
                debug!(key = %key, error = %e, "Fetch failed");
            }
            results.insert(key.clone(), result);
        }

        debug!(group = group_idx + 1, total_groups, "Fetch group completed");
    }

    results
}
