use crate::commands::quote_stack;
use crate::error::{AppError, Result};
use crate::models::{watchlist, MonitorConfig};
use crate::services::formatter::{format_market_cap_opt, format_volume, Formatter};

pub async fn run(config: &MonitorConfig, raw_tickers: &[String], force: bool) -> Result<()> {
    let mut tickers = Vec::with_capacity(raw_tickers.len());
    for raw in raw_tickers {
        let ticker = watchlist::normalize_ticker(raw);
        if !watchlist::is_valid_ticker(&ticker) {
            return Err(AppError::InvalidInput(format!("'{}' is not a valid ticker", raw)));
        }
        if !tickers.contains(&ticker) {
            tickers.push(ticker);
        }
    }

    let (_, cache) = quote_stack(config)?;
    println!("📡 Fetching {} ticker(s)...\n", tickers.len());
    let batch = if force {
        cache.refresh(&tickers).await
    } else {
        cache.get_many(&tickers).await
    };

    let formatter = Formatter::new(config.locale);
    println!(
        "{:<10} {:>14} {:>10} {:>12} {:>10}",
        "Ticker", "Price", "Change", "Volume", "Mkt Cap"
    );
    println!("═══════════════════════════════════════════════════════════");

    let mut failed = 0;
    for ticker in &tickers {
        match batch.get(ticker) {
            Some(Ok(snapshot)) => {
                let arrow = if snapshot.change_pct > 0.0 {
                    "🟢"
                } else if snapshot.change_pct < 0.0 {
                    "🔴"
                } else {
                    "⚪"
                };
                println!(
                    "{:<10} {:>14} {:>10} {:>12} {:>10} {}",
                    ticker,
                    formatter.currency(snapshot.price),
                    formatter.percent(snapshot.change_pct),
                    format_volume(snapshot.volume),
                    format_market_cap_opt(snapshot.market_cap),
                    arrow
                );
            }
            Some(Err(e)) => {
                failed += 1;
                println!("{:<10} ⚠️  unavailable: {}", ticker, e);
            }
            None => {
                failed += 1;
                println!("{:<10} ⚠️  no data", ticker);
            }
        }
    }

    if failed > 0 {
        println!("\n⚠️  {} of {} ticker(s) failed", failed, tickers.len());
    }
    Ok(())
}
