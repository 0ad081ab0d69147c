//! Provider seams
//!
//! The cache, batch fetcher and metadata database only talk to these traits; the
//! Yahoo Finance client is the production implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FetchError;
use crate::models::{StockMetadataRecord, TickerSnapshot};

/// Fetches a live quote for one exchange-qualified ticker
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, ticker: &str, now: DateTime<Utc>) -> Result<TickerSnapshot, FetchError>;
}

/// Fetches descriptive metadata (name, sector, ISIN) for one ticker
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn fetch_profile(&self, ticker: &str) -> Result<StockMetadataRecord, FetchError>;
}

#[cfg(test)]
pub mod testing {
    //! Scripted provider for unit tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Per-ticker scripted behaviour
    #[derive(Clone)]
    pub enum Script {
        Quote { price: f64, previous_close: f64 },
        Fail(FetchError),
        Hang,
    }

    #[derive(Default)]
    pub struct FakeProvider {
        scripts: Mutex<HashMap<String, Script>>,
        profiles: Mutex<HashMap<String, Result<StockMetadataRecord, FetchError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn quote(self, ticker: &str, price: f64, previous_close: f64) -> Self {
            self.set(ticker, Script::Quote { price, previous_close });
            self
        }

        pub fn failing(self, ticker: &str, error: FetchError) -> Self {
            self.set(ticker, Script::Fail(error));
            self
        }

        pub fn hanging(self, ticker: &str) -> Self {
            self.set(ticker, Script::Hang);
            self
        }

        pub fn profile(self, record: StockMetadataRecord) -> Self {
            self.profiles.lock().unwrap().insert(record.ticker.clone(), Ok(record));
            self
        }

        pub fn failing_profile(self, ticker: &str, error: FetchError) -> Self {
            self.profiles.lock().unwrap().insert(ticker.to_string(), Err(error));
            self
        }

        /// Replace the script of a ticker after construction
        pub fn set(&self, ticker: &str, script: Script) {
            self.scripts.lock().unwrap().insert(ticker.to_string(), script);
        }

        pub fn calls_for(&self, ticker: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|t| *t == ticker).count()
        }
    }

    #[async_trait]
    impl QuoteProvider for FakeProvider {
        async fn fetch_quote(&self, ticker: &str, now: DateTime<Utc>) -> Result<TickerSnapshot, FetchError> {
            self.calls.lock().unwrap().push(ticker.to_string());
            let script = self.scripts.lock().unwrap().get(ticker).cloned();
            match script {
                Some(Script::Quote { price, previous_close }) => {
                    Ok(TickerSnapshot::new(ticker, price, previous_close, 1_000, Some(1e9), now))
                }
                Some(Script::Fail(e)) => Err(e),
                Some(Script::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(FetchError::ProviderUnavailable("hang".to_string()))
                }
                None => Err(FetchError::UnknownTicker(ticker.to_string())),
            }
        }
    }

    #[async_trait]
    impl ProfileProvider for FakeProvider {
        async fn fetch_profile(&self, ticker: &str) -> Result<StockMetadataRecord, FetchError> {
            self.calls.lock().unwrap().push(ticker.to_string());
            self.profiles
                .lock()
                .unwrap()
                .get(ticker)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::UnknownTicker(ticker.to_string())))
        }
    }
}
