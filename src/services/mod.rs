pub mod batch_fetcher;
pub mod dashboard;
pub mod formatter;
pub mod metadata_source;
pub mod provider;
pub mod session;
pub mod stock_database;
pub mod ticker_cache;
pub mod trading_hours;
pub mod yahoo;

pub use batch_fetcher::{run_bounded, BatchFetcher};
pub use dashboard::{compute_view, ViewContext};
pub use formatter::Formatter;
pub use metadata_source::{MetadataSource, ProviderMetadataSource, TickerListing};
pub use provider::{ProfileProvider, QuoteProvider};
pub use session::{SessionContext, SharedSession};
pub use stock_database::{SharedStockDatabase, StockDatabase, UpdateReport};
pub use ticker_cache::{SharedTickerCache, TickerCache};
pub use yahoo::YahooClient;
