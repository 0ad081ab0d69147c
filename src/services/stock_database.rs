//! On-disk stock metadata database
//!
//! A single JSON document (`stock_database.json`) holds every known B3 stock. It is
//! loaded at startup, queried in memory, and rewritten wholesale by a user-triggered
//! update. An update either replaces the whole store or leaves it untouched.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WORKER_COUNT};
use crate::error::{AppError, Result};
use crate::models::{DatabaseStats, MetadataDocument, StockMetadataRecord};
use crate::services::batch_fetcher::run_bounded;
use crate::services::metadata_source::MetadataSource;
use crate::utils::write_json_atomic;

pub type SharedStockDatabase = Arc<StockDatabase>;

/// Result of a successful update
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub total_stocks: usize,
    pub last_updated: DateTime<Utc>,
    pub elapsed_ms: u64,
}

pub struct StockDatabase {
    path: PathBuf,
    expiry: chrono::Duration,
    document: RwLock<MetadataDocument>,
    update_gate: Mutex<()>,
    worker_count: usize,
    request_timeout: Duration,
}

/// Records written when no database file exists yet
pub fn seed_records() -> Vec<StockMetadataRecord> {
    vec![
        StockMetadataRecord::new("ABEV3.SA", "Ambev", "Bebidas").with_isin("BRABEVACNOR6"),
        StockMetadataRecord::new("BBDC4.SA", "Bradesco", "Bancos").with_isin("BRBBDCACNPR8"),
        StockMetadataRecord::new("ITUB4.SA", "Itaú Unibanco", "Bancos").with_isin("BRITUBACNPR1"),
        StockMetadataRecord::new("PETR4.SA", "Petrobras", "Petróleo, Gás e Biocombustíveis")
            .with_isin("BRPETRACNPR6"),
        StockMetadataRecord::new("VALE3.SA", "Vale", "Mineração").with_isin("BRVALEACNOR0"),
    ]
}

fn sorted(mut stocks: Vec<StockMetadataRecord>) -> Vec<StockMetadataRecord> {
    stocks.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    stocks.dedup_by(|a, b| a.ticker == b.ticker);
    stocks
}

impl StockDatabase {
    /// Load the database at `path`, seeding it when the file does not exist.
    ///
    /// An unreadable or corrupt file is never overwritten here; the seed is served
    /// from memory until the next successful update.
    pub fn open(path: impl Into<PathBuf>, expiry: chrono::Duration) -> Self {
        let path = path.into();
        let document = Self::load_or_seed(&path, Utc::now());

        Self {
            path,
            expiry,
            document: RwLock::new(document),
            update_gate: Mutex::new(()),
            worker_count: DEFAULT_WORKER_COUNT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Concurrency limits used by [`StockDatabase::update`]
    pub fn with_fetch_limits(mut self, worker_count: usize, request_timeout: Duration) -> Self {
        self.worker_count = worker_count.max(1);
        self.request_timeout = request_timeout;
        self
    }

    fn load_or_seed(path: &Path, now: DateTime<Utc>) -> MetadataDocument {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<MetadataDocument>(&contents) {
                Ok(doc) => {
                    let doc = MetadataDocument::new(sorted(doc.stocks), doc.last_updated);
                    info!(path = %path.display(), stocks = doc.total_stocks, "Loaded stock database");
                    doc
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Stock database is corrupt, serving seed records");
                    MetadataDocument::new(sorted(seed_records()), now)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let doc = MetadataDocument::new(sorted(seed_records()), now);
                match write_json_atomic(path, &doc) {
                    Ok(()) => info!(path = %path.display(), stocks = doc.total_stocks, "Created stock database"),
                    Err(e) => warn!(path = %path.display(), error = %e, "Could not write initial stock database"),
                }
                doc
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Stock database unreadable, serving seed records");
                MetadataDocument::new(sorted(seed_records()), now)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn update(&self, source: Arc<dyn MetadataSource>) -> Result<UpdateReport> {
        self.update_at(source, Utc::now()).await
    }

    /// Rescan every ticker of `source` and replace the store on full success.
    ///
    /// Any failed record aborts with [`AppError::PartialUpdate`]; a failed write aborts
    /// with [`AppError::Persistence`]. In both cases memory and disk keep the prior store.
    pub async fn update_at(&self, source: Arc<dyn MetadataSource>, now: DateTime<Utc>) -> Result<UpdateReport> {
        let _gate = self.update_gate.lock().await;
        let start = Instant::now();

        let tickers = source.list_tickers().await?;
        if tickers.is_empty() {
            return Err(AppError::NotFound("metadata source listed no tickers".to_string()));
        }
        info!(tickers = tickers.len(), workers = self.worker_count, "Updating stock database");

        let results = run_bounded(&tickers, self.worker_count, self.request_timeout, |ticker| {
            let source = source.clone();
            async move { source.fetch_record(&ticker).await }
        })
        .await;

        let mut failed = Vec::new();
        let mut records = Vec::with_capacity(results.len());
        for (ticker, result) in results {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Metadata fetch failed");
                    failed.push(ticker);
                }
            }
        }

        if !failed.is_empty() {
            failed.sort();
            warn!(failed = failed.len(), "Stock database update aborted, keeping previous snapshot");
            return Err(AppError::PartialUpdate { failed });
        }

        let document = MetadataDocument::new(sorted(records), now);
        write_json_atomic(&self.path, &document)?;

        let report = UpdateReport {
            total_stocks: document.total_stocks,
            last_updated: now,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        *self.document.write().await = document;

        info!(stocks = report.total_stocks, elapsed_ms = report.elapsed_ms, "Stock database updated");
        Ok(report)
    }

    /// Case-insensitive substring match on ticker, company name or a known industry, ordered by ticker
    pub async fn search(&self, query: &str) -> Vec<StockMetadataRecord> {
        let needle = query.trim().to_lowercase();
        self.document
            .read()
            .await
            .stocks
            .iter()
            .filter(|r| {
                r.ticker.to_lowercase().contains(&needle)
                    || r.company_name.to_lowercase().contains(&needle)
                    || (r.has_industry() && r.industry.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    pub async fn search_limited(&self, query: &str, limit: usize) -> Vec<StockMetadataRecord> {
        let mut results = self.search(query).await;
        results.truncate(limit);
        results
    }

    /// Exact sector match, ordered by ticker
    pub async fn by_sector(&self, sector: &str) -> Vec<StockMetadataRecord> {
        self.document
            .read()
            .await
            .stocks
            .iter()
            .filter(|r| r.sector == sector)
            .cloned()
            .collect()
    }

    /// Distinct sectors, sorted, without "N/A"
    pub async fn sectors(&self) -> Vec<String> {
        self.document
            .read()
            .await
            .stocks
            .iter()
            .filter(|r| r.sector != "N/A" && !r.sector.is_empty())
            .map(|r| r.sector.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub async fn get(&self, ticker: &str) -> Option<StockMetadataRecord> {
        let doc = self.document.read().await;
        doc.stocks
            .binary_search_by(|r| r.ticker.as_str().cmp(ticker))
            .ok()
            .map(|idx| doc.stocks[idx].clone())
    }

    pub async fn len(&self) -> usize {
        self.document.read().await.stocks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.document.read().await.stocks.is_empty()
    }

    pub async fn last_updated(&self) -> DateTime<Utc> {
        self.document.read().await.last_updated
    }

    /// True once the store is older than the metadata expiry
    pub async fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now - self.last_updated().await >= self.expiry
    }

    pub async fn stats(&self) -> DatabaseStats {
        self.stats_at(Utc::now()).await
    }

    pub async fn stats_at(&self, now: DateTime<Utc>) -> DatabaseStats {
        let total_sectors = self.sectors().await.len();
        let doc = self.document.read().await;
        DatabaseStats {
            total_stocks: doc.stocks.len(),
            total_sectors,
            last_updated: Some(doc.last_updated),
            cache_valid: now - doc.last_updated < self.expiry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::services::metadata_source::{ProviderMetadataSource, TickerListing};
    use crate::services::provider::testing::FakeProvider;
    use async_trait::async_trait;

    /// Source with a fixed ticker list
    struct ListSource {
        tickers: Vec<String>,
        provider: Arc<FakeProvider>,
    }

    #[async_trait]
    impl MetadataSource for ListSource {
        async fn list_tickers(&self) -> std::result::Result<Vec<String>, FetchError> {
            Ok(self.tickers.clone())
        }

        async fn fetch_record(&self, ticker: &str) -> std::result::Result<StockMetadataRecord, FetchError> {
            use crate::services::provider::ProfileProvider;
            self.provider.fetch_profile(ticker).await
        }
    }

    fn list_source(provider: FakeProvider, tickers: &[&str]) -> Arc<dyn MetadataSource> {
        Arc::new(ListSource {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            provider: Arc::new(provider),
        })
    }

    fn open_in(dir: &tempfile::TempDir) -> StockDatabase {
        StockDatabase::open(dir.path().join("stock_database.json"), chrono::Duration::hours(24))
    }

    #[tokio::test]
    async fn test_open_missing_file_seeds_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_in(&dir);

        assert_eq!(db.len().await, 5);
        assert!(db.path().exists());

        let reopened = open_in(&dir);
        assert_eq!(reopened.search("").await, db.search("").await);
    }

    #[tokio::test]
    async fn test_open_corrupt_file_keeps_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stock_database.json");
        std::fs::write(&path, "{ not json").unwrap();

        let db = StockDatabase::open(&path, chrono::Duration::hours(24));
        assert_eq!(db.len().await, 5);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_search_and_sector_queries() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_in(&dir);

        let unibanco = db.search("BANCO").await;
        assert_eq!(unibanco.len(), 1);

        let itau = db.search("itaú").await;
        assert_eq!(itau.len(), 1);
        assert_eq!(itau[0].ticker, "ITUB4.SA");

        let by_code = db.search("4.sa").await;
        let tickers: Vec<&str> = by_code.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["BBDC4.SA", "ITUB4.SA", "PETR4.SA"]);

        let bancos = db.by_sector("Bancos").await;
        assert_eq!(bancos.len(), 2);
        assert!(db.by_sector("bancos").await.is_empty());

        assert_eq!(db.search_limited("", 2).await.len(), 2);

        // The "N/A" industry placeholder is not searchable
        assert!(db.search("n/").await.is_empty());
        let tickers: Vec<String> = db.search("n").await.into_iter().map(|r| r.ticker).collect();
        assert_eq!(tickers, vec!["ITUB4.SA"]);
        assert_eq!(db.get("VALE3.SA").await.unwrap().company_name, "Vale");
        assert!(db.get("XXXX3.SA").await.is_none());
    }

    #[tokio::test]
    async fn test_sectors_exclude_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_in(&dir);
        let provider = FakeProvider::new()
            .profile(StockMetadataRecord::new("AAAA3.SA", "Alpha", "N/A"))
            .profile(StockMetadataRecord::new("BBBB3.SA", "Beta", "Energy"))
            .profile(StockMetadataRecord::new("CCCC3.SA", "Gamma", "Utilities"));

        db.update(list_source(provider, &["CCCC3.SA", "AAAA3.SA", "BBBB3.SA"]))
            .await
            .unwrap();

        assert_eq!(db.sectors().await, vec!["Energy".to_string(), "Utilities".to_string()]);
        let all: Vec<String> = db.search("").await.into_iter().map(|r| r.ticker).collect();
        assert_eq!(all, vec!["AAAA3.SA", "BBBB3.SA", "CCCC3.SA"]);
    }

    #[tokio::test]
    async fn test_successful_update_replaces_store_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_in(&dir);
        let provider = FakeProvider::new()
            .profile(StockMetadataRecord::new("WEGE3.SA", "WEG", "Industrials").with_industry("Electrical Equipment"));

        let report = db.update(list_source(provider, &["WEGE3.SA"])).await.unwrap();
        assert_eq!(report.total_stocks, 1);

        let reopened = open_in(&dir);
        assert_eq!(reopened.len().await, 1);
        assert_eq!(reopened.search("electrical").await[0].ticker, "WEGE3.SA");
        assert!(!dir.path().join("stock_database.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_update_leaves_queries_identical() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_in(&dir);
        let before_search = db.search("a").await;
        let before_sector = db.by_sector("Bancos").await;
        let before_disk = std::fs::read_to_string(db.path()).unwrap();

        let provider = FakeProvider::new()
            .profile(StockMetadataRecord::new("WEGE3.SA", "WEG", "Industrials"))
            .failing_profile("VALE3.SA", FetchError::ProviderUnavailable("timeout".into()));
        let result = db.update(list_source(provider, &["WEGE3.SA", "VALE3.SA", "ZZZZ3.SA"])).await;

        match result {
            Err(AppError::PartialUpdate { failed }) => {
                assert_eq!(failed, vec!["VALE3.SA".to_string(), "ZZZZ3.SA".to_string()]);
            }
            other => panic!("expected PartialUpdate, got {:?}", other.map(|r| r.total_stocks)),
        }

        assert_eq!(db.search("a").await, before_search);
        assert_eq!(db.by_sector("Bancos").await, before_sector);
        assert_eq!(std::fs::read_to_string(db.path()).unwrap(), before_disk);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        // Parent path is a regular file, so the write must fail
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let db = StockDatabase::open(blocker.join("stock_database.json"), chrono::Duration::hours(24));
        let before = db.search("").await;

        let provider = FakeProvider::new().profile(StockMetadataRecord::new("WEGE3.SA", "WEG", "Industrials"));
        let result = db.update(list_source(provider, &["WEGE3.SA"])).await;

        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert_eq!(db.search("").await, before);
    }

    #[tokio::test]
    async fn test_stats_and_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_in(&dir);
        let updated = db.last_updated().await;

        let stats = db.stats_at(updated + chrono::Duration::hours(1)).await;
        assert_eq!(stats.total_stocks, 5);
        assert_eq!(stats.total_sectors, 4);
        assert!(stats.cache_valid);

        assert!(!db.is_stale_at(updated + chrono::Duration::hours(23)).await);
        assert!(db.is_stale_at(updated + chrono::Duration::hours(24)).await);
    }

    #[tokio::test]
    async fn test_update_with_provider_source() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_in(&dir).with_fetch_limits(3, Duration::from_secs(5));

        let mut provider = FakeProvider::new();
        for ticker in crate::constants::KNOWN_B3_TICKERS {
            provider = provider.profile(StockMetadataRecord::new(ticker, ticker, "Energy"));
        }
        let source =
            ProviderMetadataSource::new(Arc::new(provider), TickerListing::Known, Duration::from_secs(1)).unwrap();

        let report = db.update(Arc::new(source)).await.unwrap();
        assert_eq!(report.total_stocks, crate::constants::KNOWN_B3_TICKERS.len());
    }
}
