use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{initial_settings, open_database, quote_stack};
use crate::error::Result;
use crate::models::{DashboardView, MonitorConfig};
use crate::server::{self, AppState};
use crate::services::formatter::Formatter;
use crate::services::metadata_source::{ProviderMetadataSource, TickerListing};
use crate::services::session::SessionContext;
use crate::services::trading_hours::is_trading_hours;
use crate::worker::{HealthStats, RefreshScheduler, RefreshTrigger};

pub async fn run(config: MonitorConfig, port: u16) -> Result<()> {
    println!("🚀 Starting b3monitor server on port {}", port);
    println!("📁 Data directory: {}", config.data_dir.display());

    let (client, cache) = quote_stack(&config)?;

    let database = Arc::new(open_database(&config));
    let stats = database.stats().await;
    println!("✅ Stock database loaded:");
    println!("   📈 Stocks:  {}", stats.total_stocks);
    println!("   🏷️  Sectors: {}", stats.total_sectors);
    if !stats.cache_valid {
        println!("   ⚠️  Database is outdated, use the update button or 'update-db'");
    }

    let metadata_source = ProviderMetadataSource::new(client, TickerListing::Known, config.request_timeout)?;

    let settings = initial_settings(&config);
    let session = match &config.watchlist_file {
        Some(path) => {
            println!("📝 Watchlist snapshot: {}", path.display());
            SessionContext::with_snapshot(settings, path.clone())
        }
        None => SessionContext::new(settings),
    }
    .into_shared();

    println!();
    println!("🔧 Refresh configuration:");
    println!("   💻 CPU cores detected: {}", num_cpus::get());
    println!("   ⚡ Concurrent requests: {}", config.worker_count);
    println!("   ⏱️  Refresh interval:   {}s", settings.interval_secs);
    println!("   🗄️  Cache expiry:       {}s", config.cache_expiry.as_secs());
    println!(
        "   🕙 B3 session:         {}",
        if is_trading_hours() { "open" } else { "closed" }
    );
    println!();

    let view = Arc::new(RwLock::new(DashboardView::empty(settings.interval_secs, settings.auto_refresh)));
    let health_stats = Arc::new(RwLock::new(HealthStats::default()));
    let trigger = RefreshTrigger::new();

    let scheduler = RefreshScheduler::new(
        cache.clone(),
        session.clone(),
        database.clone(),
        view.clone(),
        health_stats.clone(),
        trigger.clone(),
        Formatter::new(config.locale),
    );
    println!("⚡ Spawning refresh worker (every {}s)...", settings.interval_secs);
    tokio::spawn(scheduler.run());

    let state = AppState {
        cache,
        session,
        database,
        metadata_source: Arc::new(metadata_source),
        view,
        health_stats,
        trigger,
        config: Arc::new(config),
    };

    println!("🌐 Dashboard: http://localhost:{}/", port);
    server::serve(state, port).await
}
