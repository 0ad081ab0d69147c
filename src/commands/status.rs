use crate::commands::open_database;
use crate::error::Result;
use crate::models::MonitorConfig;
use crate::services::trading_hours::{is_trading_hours, TradingHours};

pub async fn run(config: &MonitorConfig) -> Result<()> {
    println!("📊 b3monitor Status\n");

    let hours = TradingHours::default();
    println!("🕙 B3 session: {:02}:00-{:02}:00 {}", hours.start_hour, hours.end_hour, hours.timezone);
    println!(
        "   Market is {}\n",
        if is_trading_hours() { "🟢 open" } else { "🔴 closed" }
    );

    println!("═══════════════════════════════════════════════════════════\n");
    println!("⚙️  Configuration");
    println!("   Refresh interval: {}s", config.refresh_interval.as_secs());
    println!("   Cache expiry:     {}s", config.cache_expiry.as_secs());
    println!("   Metadata expiry:  {}h", config.metadata_expiry.as_secs() / 3600);
    println!("   Workers:          {}", config.worker_count);
    println!("   Request timeout:  {}s", config.request_timeout.as_secs());
    println!("   Locale:           {}", config.locale.as_str());
    if let Some(path) = &config.watchlist_file {
        println!("   Watchlist file:   {}", path.display());
    }

    println!("\n═══════════════════════════════════════════════════════════\n");
    let database = open_database(config);
    let stats = database.stats().await;
    println!("🗄️  Stock database: {}", database.path().display());
    println!("   Stocks:  {}", stats.total_stocks);
    println!("   Sectors: {}", stats.total_sectors);
    match stats.last_updated {
        Some(at) => println!("   Updated: {}", at.to_rfc3339()),
        None => println!("   Updated: never"),
    }
    if stats.cache_valid {
        println!("   ✅ Up to date");
    } else {
        println!("   ⚠️  Outdated, run 'update-db'");
    }

    Ok(())
}
