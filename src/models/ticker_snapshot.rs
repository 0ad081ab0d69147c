use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One fetched price/metrics record for a single ticker.
///
/// Snapshots are never mutated after creation; a refetch produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    /// Exchange-qualified symbol, e.g. "PETR4.SA"
    pub ticker: String,
    pub price: f64,
    pub previous_close: f64,
    pub change_pct: f64,
    pub volume: u64,
    pub market_cap: Option<f64>,
    pub fetched_at: DateTime<Utc>,
    /// False when the provider gave no usable previous close (change is then 0)
    pub valid: bool,

    // Display metrics, filled when the provider reports them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
    /// Mean yearly dividend over the mean close of the last five years, in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_dividend_yield_5y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pb_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_margin: Option<f64>,
}

impl TickerSnapshot {
    /// Build a snapshot from core quote fields, deriving change and validity
    pub fn new(
        ticker: impl Into<String>,
        price: f64,
        previous_close: f64,
        volume: u64,
        market_cap: Option<f64>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let valid = previous_close.is_finite() && previous_close > 0.0;
        let change_pct = if valid {
            (price - previous_close) / previous_close * 100.0
        } else {
            0.0
        };

        Self {
            ticker: ticker.into(),
            price,
            previous_close,
            change_pct,
            volume,
            market_cap,
            fetched_at,
            valid,
            name: None,
            sector: None,
            currency: None,
            dividend_yield: None,
            avg_dividend_yield_5y: None,
            pe_ratio: None,
            pb_ratio: None,
            profit_margin: None,
        }
    }

    /// Age of this snapshot at `now` (zero if the clock went backwards)
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).max(Duration::zero())
    }

    /// Fresh means strictly younger than the expiry window
    pub fn is_fresh(&self, now: DateTime<Utc>, expiry: Duration) -> bool {
        self.age(now) < expiry
    }

    /// Display name, falling back to the bare code ("PETR4.SA" -> "PETR4")
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.ticker.strip_suffix(".SA").unwrap_or(&self.ticker),
        }
    }
}
