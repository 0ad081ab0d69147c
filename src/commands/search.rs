use crate::commands::open_database;
use crate::constants::SEARCH_RESULT_LIMIT;
use crate::error::Result;
use crate::models::{MonitorConfig, StockMetadataRecord};
use crate::services::formatter::sector_icon;

pub async fn run(config: &MonitorConfig, query: &str, sector: Option<&str>) -> Result<()> {
    let database = open_database(config);

    let mut records: Vec<StockMetadataRecord> = match sector {
        Some(sector) => {
            let needle = query.trim().to_lowercase();
            let mut records = database.by_sector(sector).await;
            if !needle.is_empty() {
                records.retain(|r| {
                    r.ticker.to_lowercase().contains(&needle) || r.company_name.to_lowercase().contains(&needle)
                });
            }
            records
        }
        None => database.search(query).await,
    };

    if records.is_empty() {
        println!("🔍 No stocks found");
        if sector.is_some() {
            println!("💡 Known sectors: {}", database.sectors().await.join(", "));
        }
        return Ok(());
    }

    let total = records.len();
    records.truncate(SEARCH_RESULT_LIMIT);
    println!("🔍 {} stock(s) found\n", total);
    for record in &records {
        println!(
            "{} {:<10} {:<32} {} / {}",
            sector_icon(&record.sector),
            record.ticker,
            record.company_name,
            record.sector,
            record.industry
        );
    }
    if total > records.len() {
        println!("\n… {} more, refine the query", total - records.len());
    }
    Ok(())
}
