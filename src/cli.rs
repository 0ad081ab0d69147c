use clap::{Parser, Subcommand};

use crate::commands;
use crate::error::Result;
use crate::models::MonitorConfig;

#[derive(Parser)]
#[command(name = "b3monitor")]
#[command(about = "Near-real-time B3 stock dashboard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the dashboard server and the refresh worker
    Serve {
        /// Port to listen on (defaults to $PORT or 8501)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Fetch quotes once and print them
    Quote {
        /// Exchange-qualified tickers such as PETR4.SA
        #[arg(required = true)]
        tickers: Vec<String>,
        /// Skip the cache freshness check
        #[arg(short, long)]
        force: bool,
    },
    /// Rebuild the stock metadata database
    UpdateDb {
        /// Scrape the ticker list from dadosdemercado.com.br instead of the built-in list
        #[arg(long)]
        scrape: bool,
    },
    /// Search the stock metadata database
    Search {
        /// Matches ticker, company name or industry
        #[arg(default_value = "")]
        query: String,
        /// Restrict to one sector
        #[arg(short, long)]
        sector: Option<String>,
    },
    /// Show configuration and database status
    Status,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = MonitorConfig::from_env();

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            commands::serve::run(config, port).await
        }
        Commands::Quote { tickers, force } => commands::quote::run(&config, &tickers, force).await,
        Commands::UpdateDb { scrape } => commands::update_db::run(&config, scrape).await,
        Commands::Search { query, sector } => commands::search::run(&config, &query, sector.as_deref()).await,
        Commands::Status => commands::status::run(&config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quote_command() {
        let cli = Cli::try_parse_from(["b3monitor", "quote", "PETR4.SA", "vale3.sa", "--force"]).unwrap();
        match cli.command {
            Commands::Quote { tickers, force } => {
                assert_eq!(tickers, vec!["PETR4.SA", "vale3.sa"]);
                assert!(force);
            }
            _ => panic!("expected quote"),
        }
    }

    #[test]
    fn test_parse_search_defaults() {
        let cli = Cli::try_parse_from(["b3monitor", "search", "--sector", "Bancos"]).unwrap();
        match cli.command {
            Commands::Search { query, sector } => {
                assert_eq!(query, "");
                assert_eq!(sector.as_deref(), Some("Bancos"));
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_quote_requires_tickers() {
        assert!(Cli::try_parse_from(["b3monitor", "quote"]).is_err());
    }
}
