use chrono::{DateTime, Utc};
use serde::Serialize;

/// Direction of the daily change, used to color the row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn from_change(change_pct: f64) -> Self {
        if change_pct > 0.0 {
            Trend::Up
        } else if change_pct < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

/// Formatted metrics of one watchlist row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowMetrics {
    pub price: String,
    pub change: String,
    pub trend: Trend,
    pub volume: String,
    pub market_cap: String,
    pub dividend_yield: String,
    pub avg_dividend_yield_5y: String,
    pub pe_ratio: String,
    pub pb_ratio: String,
    pub profit_margin: String,
    /// Seconds since the snapshot was fetched
    pub age_secs: i64,
}

/// Either formatted metrics or the reason they are unavailable
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    Available(RowMetrics),
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistRow {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub sector_icon: &'static str,
    #[serde(flatten)]
    pub status: RowStatus,
}

/// Everything the dashboard needs to render one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub rows: Vec<WatchlistRow>,
    pub watched_count: usize,
    pub unavailable_count: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub auto_refresh: bool,
    pub refresh_secs: u64,
    pub market_open: bool,
}

impl DashboardView {
    /// View shown before the first tick completes
    pub fn empty(refresh_secs: u64, auto_refresh: bool) -> Self {
        Self {
            rows: Vec::new(),
            watched_count: 0,
            unavailable_count: 0,
            last_update: None,
            auto_refresh,
            refresh_secs,
            market_open: false,
        }
    }
}
