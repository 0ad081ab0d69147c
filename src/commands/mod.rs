pub mod quote;
pub mod search;
pub mod serve;
pub mod status;
pub mod update_db;

use std::sync::Arc;

use crate::constants::REFRESH_INTERVAL_CHOICES;
use crate::error::Result;
use crate::models::MonitorConfig;
use crate::services::batch_fetcher::BatchFetcher;
use crate::services::session::RefreshSettings;
use crate::services::stock_database::StockDatabase;
use crate::services::ticker_cache::TickerCache;
use crate::services::yahoo::YahooClient;

/// Yahoo client plus a quote cache in front of it
pub(crate) fn quote_stack(config: &MonitorConfig) -> Result<(Arc<YahooClient>, Arc<TickerCache>)> {
    let client = Arc::new(YahooClient::new(config.request_timeout)?);
    let fetcher = BatchFetcher::new(client.clone(), config.worker_count, config.request_timeout);
    let cache = Arc::new(TickerCache::new(fetcher, config.cache_expiry_chrono()));
    Ok((client, cache))
}

pub(crate) fn open_database(config: &MonitorConfig) -> StockDatabase {
    StockDatabase::open(config.database_path(), config.metadata_expiry_chrono())
        .with_fetch_limits(config.worker_count, config.request_timeout)
}

/// Startup refresh settings; an interval outside the selector choices falls back to the default
pub(crate) fn initial_settings(config: &MonitorConfig) -> RefreshSettings {
    let secs = config.refresh_interval.as_secs();
    if REFRESH_INTERVAL_CHOICES.contains(&secs) {
        RefreshSettings {
            interval_secs: secs,
            ..RefreshSettings::default()
        }
    } else {
        tracing::warn!(secs, "Refresh interval is not one of {:?}, using default", REFRESH_INTERVAL_CHOICES);
        RefreshSettings::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_initial_settings() {
        let config = MonitorConfig {
            refresh_interval: Duration::from_secs(10),
            ..MonitorConfig::default()
        };
        assert_eq!(initial_settings(&config).interval_secs, 10);

        let config = MonitorConfig {
            refresh_interval: Duration::from_secs(7),
            ..MonitorConfig::default()
        };
        assert_eq!(initial_settings(&config).interval_secs, 2);
    }
}
