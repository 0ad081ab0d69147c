use std::sync::Arc;

use crate::commands::{open_database, quote_stack};
use crate::error::{AppError, Result};
use crate::models::MonitorConfig;
use crate::services::metadata_source::{ProviderMetadataSource, TickerListing};

pub async fn run(config: &MonitorConfig, scrape: bool) -> Result<()> {
    let listing = if scrape {
        TickerListing::DadosMercado
    } else {
        TickerListing::Known
    };

    let database = open_database(config);
    println!("🗄️  Database: {}", database.path().display());
    println!("📊 Current stocks: {}", database.len().await);
    println!("🔄 Updating metadata ({:?} listing)...", listing);

    let (client, _) = quote_stack(config)?;
    let source = ProviderMetadataSource::new(client, listing, config.request_timeout)?;

    match database.update(Arc::new(source)).await {
        Ok(report) => {
            println!("✅ Database updated with {} stocks in {}ms", report.total_stocks, report.elapsed_ms);
            Ok(())
        }
        Err(AppError::PartialUpdate { failed }) => {
            println!("❌ Update aborted, {} ticker(s) failed:", failed.len());
            for ticker in &failed {
                println!("   - {}", ticker);
            }
            println!("💡 The previous database was kept unchanged");
            Err(AppError::PartialUpdate { failed })
        }
        Err(e) => Err(e),
    }
}
