mod dashboard;
mod locale;
mod monitor_config;
mod stock_metadata;
mod ticker_snapshot;
pub mod watchlist;

pub use dashboard::{DashboardView, RowMetrics, RowStatus, Trend, WatchlistRow};
pub use locale::NumberLocale;
pub use monitor_config::MonitorConfig;
pub use stock_metadata::{
    placeholder_isin, ticker_code, DatabaseStats, MetadataDocument, StockMetadataRecord,
};
pub use ticker_snapshot::TickerSnapshot;
pub use watchlist::{WatchlistError, WatchlistState};

use std::collections::HashMap;

use crate::error::FetchError;

/// Outcome of fetching one ticker
pub type QuoteOutcome = Result<TickerSnapshot, FetchError>;

/// Outcomes of a batch (ticker -> snapshot or failure)
pub type QuoteBatch = HashMap<String, QuoteOutcome>;
