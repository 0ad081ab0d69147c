//! Pure dashboard view computation
//!
//! Turns the watchlist, the quote outcomes of one tick and the metadata database
//! into a [`DashboardView`]. No I/O happens here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{
    ticker_code, DashboardView, QuoteBatch, RowMetrics, RowStatus, StockMetadataRecord, TickerSnapshot, Trend,
    WatchlistRow,
};
use crate::services::formatter::{format_market_cap_opt, format_volume, sector_icon, Formatter};
use crate::services::session::RefreshSettings;

/// Everything besides the data that shapes a view
#[derive(Debug, Clone, Copy)]
pub struct ViewContext {
    pub formatter: Formatter,
    pub settings: RefreshSettings,
    pub last_update: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
    pub market_open: bool,
}

fn row_metrics(snapshot: &TickerSnapshot, fmt: &Formatter, now: DateTime<Utc>) -> RowMetrics {
    RowMetrics {
        price: fmt.currency(snapshot.price),
        change: fmt.percent(snapshot.change_pct),
        trend: Trend::from_change(snapshot.change_pct),
        volume: format_volume(snapshot.volume),
        market_cap: format_market_cap_opt(snapshot.market_cap),
        dividend_yield: fmt.rate_opt(snapshot.dividend_yield),
        avg_dividend_yield_5y: fmt.rate_opt(snapshot.avg_dividend_yield_5y),
        pe_ratio: fmt.ratio_opt(snapshot.pe_ratio),
        pb_ratio: fmt.ratio_opt(snapshot.pb_ratio),
        profit_margin: fmt.rate_opt(snapshot.profit_margin),
        age_secs: snapshot.age(now).num_seconds(),
    }
}

/// Build one row per watched ticker, in watchlist order
pub fn compute_view(
    tickers: &[String],
    quotes: &QuoteBatch,
    metadata: &HashMap<String, StockMetadataRecord>,
    ctx: &ViewContext,
) -> DashboardView {
    let rows: Vec<WatchlistRow> = tickers
        .iter()
        .map(|ticker| {
            let record = metadata.get(ticker);
            let snapshot = quotes.get(ticker).and_then(|outcome| outcome.as_ref().ok());

            let name = snapshot
                .and_then(|s| s.name.clone())
                .or_else(|| record.map(|r| r.company_name.clone()))
                .unwrap_or_else(|| ticker_code(ticker).to_string());
            let sector = snapshot
                .and_then(|s| s.sector.clone())
                .or_else(|| record.map(|r| r.sector.clone()))
                .unwrap_or_else(|| "N/A".to_string());

            let status = match quotes.get(ticker) {
                Some(Ok(snapshot)) => RowStatus::Available(row_metrics(snapshot, &ctx.formatter, ctx.now)),
                Some(Err(e)) => RowStatus::Unavailable {
                    reason: e.label().to_string(),
                },
                None => RowStatus::Unavailable {
                    reason: "no data yet".to_string(),
                },
            };

            WatchlistRow {
                ticker: ticker.clone(),
                sector_icon: sector_icon(&sector),
                name,
                sector,
                status,
            }
        })
        .collect();

    let unavailable_count = rows
        .iter()
        .filter(|r| matches!(r.status, RowStatus::Unavailable { .. }))
        .count();

    DashboardView {
        watched_count: rows.len(),
        unavailable_count,
        rows,
        last_update: ctx.last_update,
        auto_refresh: ctx.settings.auto_refresh,
        refresh_secs: ctx.settings.interval_secs,
        market_open: ctx.market_open,
    }
}
