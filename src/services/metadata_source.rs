//! Where metadata updates get their ticker list and per-ticker records

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::USER_AGENT;
use tracing::{info, warn};

use crate::constants::{B3_SUFFIX, DADOS_MERCADO_BASE_URL, KNOWN_B3_TICKERS};
use crate::error::FetchError;
use crate::models::StockMetadataRecord;
use crate::services::provider::ProfileProvider;

const LISTING_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Input of a stock database update
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Symbols to scan, exchange-qualified
    async fn list_tickers(&self) -> Result<Vec<String>, FetchError>;

    async fn fetch_record(&self, ticker: &str) -> Result<StockMetadataRecord, FetchError>;
}

/// How the list of tickers to scan is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickerListing {
    /// Built-in list of liquid B3 tickers
    #[default]
    Known,
    /// Scrape the dadosdemercado.com.br stock index, falling back to `Known`
    DadosMercado,
}

/// Lists tickers via a [`TickerListing`] and fetches each record from a profile provider
pub struct ProviderMetadataSource {
    profiles: Arc<dyn ProfileProvider>,
    listing: TickerListing,
    http: reqwest::Client,
    listing_url: String,
}

impl ProviderMetadataSource {
    pub fn new(
        profiles: Arc<dyn ProfileProvider>,
        listing: TickerListing,
        request_timeout: Duration,
    ) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            profiles,
            listing,
            http,
            listing_url: format!("{}/acoes", DADOS_MERCADO_BASE_URL),
        })
    }

    async fn scrape_listing(&self) -> Result<Vec<String>, FetchError> {
        let response = self
            .http
            .get(&self.listing_url)
            .header(USER_AGENT, LISTING_USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ProviderUnavailable(format!(
                "HTTP {} from {}",
                status, self.listing_url
            )));
        }

        let html = response.text().await?;
        Ok(extract_listing_tickers(&html))
    }
}

#[async_trait]
impl MetadataSource for ProviderMetadataSource {
    async fn list_tickers(&self) -> Result<Vec<String>, FetchError> {
        match self.listing {
            TickerListing::Known => Ok(known_tickers()),
            TickerListing::DadosMercado => match self.scrape_listing().await {
                Ok(tickers) if !tickers.is_empty() => {
                    info!(count = tickers.len(), "Scraped B3 listing");
                    Ok(tickers)
                }
                Ok(_) => {
                    warn!("Listing page had no stock links, using built-in ticker list");
                    Ok(known_tickers())
                }
                Err(e) => {
                    warn!(error = %e, "Listing scrape failed, using built-in ticker list");
                    Ok(known_tickers())
                }
            },
        }
    }

    async fn fetch_record(&self, ticker: &str) -> Result<StockMetadataRecord, FetchError> {
        self.profiles.fetch_profile(ticker).await
    }
}

pub fn known_tickers() -> Vec<String> {
    KNOWN_B3_TICKERS.iter().map(|t| t.to_string()).collect()
}

static LISTING_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"href="(?:https?://[^"/]+)?/acoes/([A-Za-z0-9]{4,6})/?""#).ok());

/// Collect `/acoes/<code>` links from the listing page, in page order without duplicates
pub fn extract_listing_tickers(html: &str) -> Vec<String> {
    let Some(pattern) = LISTING_LINK.as_ref() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    pattern
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .map(|code| format!("{}{}", code.as_str().to_uppercase(), B3_SUFFIX))
        .filter(|ticker| seen.insert(ticker.clone()))
        .collect()
}
