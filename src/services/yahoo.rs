//! Yahoo Finance client
//!
//! Quotes come from the chart endpoint; ratios and company profile come from
//! quoteSummary. Raw payloads are parsed into typed schemas and then validated,
//! so every failure reaches the caller as a [`FetchError`] variant.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, COOKIE, SET_COOKIE, USER_AGENT};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{FetchError, Result};
use crate::models::{ticker_code, StockMetadataRecord, TickerSnapshot};
use crate::services::provider::{ProfileProvider, QuoteProvider};

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Hands out the session cookie that quoteSummary crumbs are bound to
pub const YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";

const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile";

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

// ---- chart endpoint schema ----

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
    #[serde(default)]
    events: Option<ChartEvents>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEvents {
    /// Keyed by payment timestamp
    #[serde(default)]
    dividends: HashMap<String, DividendEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    currency: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_volume: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ---- quoteSummary endpoint schema ----

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    result: Option<Vec<QuoteSummary>>,
    error: Option<ProviderErrorBody>,
}

/// `{"raw": 0.05, "fmt": "5.00%"}`; Yahoo sends `{}` when a value is unknown
#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw).filter(|v| v.is_finite())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    currency: Option<String>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    dividend_yield: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    price_to_book: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    profit_margins: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
}

/// Validated quoteSummary payload
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetail>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatistics>,
    #[serde(default)]
    financial_data: Option<FinancialData>,
    #[serde(default)]
    asset_profile: Option<AssetProfile>,
}

impl QuoteSummary {
    fn name(&self) -> Option<String> {
        let price = self.price.as_ref()?;
        price
            .short_name
            .clone()
            .or_else(|| price.long_name.clone())
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
    }

    fn sector(&self) -> Option<String> {
        self.asset_profile.as_ref()?.sector.clone().filter(|s| !s.is_empty())
    }

    fn industry(&self) -> Option<String> {
        self.asset_profile.as_ref()?.industry.clone().filter(|s| !s.is_empty())
    }

    fn market_cap(&self) -> Option<f64> {
        self.price
            .as_ref()
            .and_then(|p| raw(&p.market_cap))
            .or_else(|| self.summary_detail.as_ref().and_then(|d| raw(&d.market_cap)))
    }

    /// Dividend yield in percent
    fn dividend_yield(&self) -> Option<f64> {
        let detail = self.summary_detail.as_ref()?;
        raw(&detail.dividend_yield).map(|v| v * 100.0)
    }

    fn pe_ratio(&self) -> Option<f64> {
        let detail = self.summary_detail.as_ref()?;
        raw(&detail.trailing_pe).or_else(|| raw(&detail.forward_pe))
    }

    fn pb_ratio(&self) -> Option<f64> {
        raw(&self.default_key_statistics.as_ref()?.price_to_book)
    }

    /// Net margin in percent
    fn profit_margin(&self) -> Option<f64> {
        raw(&self.financial_data.as_ref()?.profit_margins).map(|v| v * 100.0)
    }

    /// Fill the optional display metrics of a snapshot
    pub fn enrich(&self, mut snapshot: TickerSnapshot) -> TickerSnapshot {
        if let Some(name) = self.name() {
            snapshot.name = Some(name);
        }
        snapshot.sector = self.sector().or(snapshot.sector);
        snapshot.market_cap = self.market_cap().or(snapshot.market_cap);
        snapshot.dividend_yield = self.dividend_yield();
        snapshot.pe_ratio = self.pe_ratio();
        snapshot.pb_ratio = self.pb_ratio();
        snapshot.profit_margin = self.profit_margin();
        if snapshot.currency.is_none() {
            snapshot.currency = self.price.as_ref().and_then(|p| p.currency.clone());
        }
        snapshot
    }

    /// Metadata record for the stock database
    pub fn to_record(&self, ticker: &str) -> StockMetadataRecord {
        let name = self.name().unwrap_or_else(|| ticker_code(ticker).to_uppercase());
        let sector = self.sector().unwrap_or_else(|| "N/A".to_string());
        let industry = self.industry().unwrap_or_else(|| "N/A".to_string());
        StockMetadataRecord::new(ticker, &name, &sector).with_industry(&industry)
    }
}

fn provider_error(ticker: &str, err: ProviderErrorBody) -> FetchError {
    let description = err.description.unwrap_or_default();
    if err.code.eq_ignore_ascii_case("Not Found") {
        FetchError::UnknownTicker(ticker.to_string())
    } else {
        FetchError::ProviderUnavailable(format!("{}: {}", err.code, description))
    }
}

fn last_value(series: &[Option<f64>]) -> Option<f64> {
    series.iter().rev().flatten().copied().find(|v| v.is_finite())
}

/// Parse a chart payload into a snapshot stamped with `now`
pub fn parse_chart_response(ticker: &str, body: &str, now: DateTime<Utc>) -> std::result::Result<TickerSnapshot, FetchError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("chart payload: {}", e)))?;

    if let Some(err) = envelope.chart.error {
        return Err(provider_error(ticker, err));
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| FetchError::MalformedResponse("chart payload has no result".to_string()))?;

    let series = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .unwrap_or_default();
    let closes: Vec<f64> = series.close.iter().flatten().copied().filter(|v| v.is_finite()).collect();

    let price = result
        .meta
        .regular_market_price
        .filter(|p| p.is_finite())
        .or_else(|| closes.last().copied())
        .filter(|p| *p > 0.0)
        .ok_or_else(|| FetchError::MalformedResponse(format!("no price for {}", ticker)))?;

    // Yesterday's close is the second to last daily bar
    let previous_close = if closes.len() >= 2 {
        closes[closes.len() - 2]
    } else {
        result
            .meta
            .previous_close
            .or(result.meta.chart_previous_close)
            .unwrap_or(0.0)
    };

    let volume = result
        .meta
        .regular_market_volume
        .or_else(|| last_value(&series.volume))
        .filter(|v| *v >= 0.0)
        .unwrap_or(0.0) as u64;

    let mut snapshot = TickerSnapshot::new(ticker, price, previous_close, volume, None, now);
    snapshot.currency = result.meta.currency;
    snapshot.name = result.meta.long_name.or(result.meta.short_name);
    Ok(snapshot)
}

/// Parse a quoteSummary payload
pub fn parse_summary_response(ticker: &str, body: &str) -> std::result::Result<QuoteSummary, FetchError> {
    let envelope: SummaryEnvelope = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("quoteSummary payload: {}", e)))?;

    if let Some(err) = envelope.quote_summary.error {
        return Err(provider_error(ticker, err));
    }

    envelope
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| FetchError::MalformedResponse("quoteSummary payload has no result".to_string()))
}

/// Five-year average dividend yield in percent: mean yearly dividend over mean monthly close.
///
/// `Ok(None)` when the stock paid nothing in the window.
pub fn parse_dividend_history(ticker: &str, body: &str) -> std::result::Result<Option<f64>, FetchError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("dividend payload: {}", e)))?;

    if let Some(err) = envelope.chart.error {
        return Err(provider_error(ticker, err));
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| FetchError::MalformedResponse("dividend payload has no result".to_string()))?;

    let mut yearly: BTreeMap<i32, f64> = BTreeMap::new();
    for event in result.events.unwrap_or_default().dividends.into_values() {
        if !event.amount.is_finite() || event.amount <= 0.0 {
            continue;
        }
        if let Some(paid_at) = DateTime::<Utc>::from_timestamp(event.date, 0) {
            *yearly.entry(paid_at.year()).or_insert(0.0) += event.amount;
        }
    }
    if yearly.is_empty() {
        return Ok(None);
    }

    let closes: Vec<f64> = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .unwrap_or_default()
        .close
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    if closes.is_empty() {
        return Ok(None);
    }

    let avg_dividend = yearly.values().sum::<f64>() / yearly.len() as f64;
    let avg_close = closes.iter().sum::<f64>() / closes.len() as f64;
    Ok(Some(avg_dividend / avg_close * 100.0))
}

/// Session cookie plus the crumb quoteSummary expects alongside it
#[derive(Debug, Clone)]
struct Crumb {
    cookie: String,
    value: String,
}

fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

async fn read_body(ticker: &str, response: Response) -> std::result::Result<String, FetchError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::UnknownTicker(ticker.to_string()));
    }
    if !status.is_success() {
        return Err(FetchError::ProviderUnavailable(format!("HTTP {} for {}", status, ticker)));
    }

    Ok(response.text().await?)
}

#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
    cookie_url: String,
    enrich_quotes: bool,
    /// Budget for the optional summary and dividend calls of a quote
    enrichment_timeout: Duration,
    crumb: Arc<Mutex<Option<Crumb>>>,
}

impl YahooClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            base_url: YAHOO_BASE_URL.to_string(),
            cookie_url: YAHOO_COOKIE_URL.to_string(),
            enrich_quotes: true,
            // The chart call keeps the whole request budget
            enrichment_timeout: request_timeout / 2,
            crumb: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_cookie_url(mut self, cookie_url: impl Into<String>) -> Self {
        self.cookie_url = cookie_url.into();
        self
    }

    /// Skip the quoteSummary and dividend calls when building quotes
    pub fn without_enrichment(mut self) -> Self {
        self.enrich_quotes = false;
        self
    }

    fn user_agent(&self) -> &'static str {
        USER_AGENTS.choose(&mut rand::thread_rng()).copied().unwrap_or(USER_AGENTS[0])
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, FetchError> {
        Ok(request
            .header(USER_AGENT, self.user_agent())
            .header(ACCEPT, "application/json")
            .send()
            .await?)
    }

    /// Cookie from the consent host, then a crumb bound to it
    async fn handshake(&self) -> std::result::Result<Crumb, FetchError> {
        // The cookie host answers 404 but still sets the cookie
        let response = self.send(self.client.get(&self.cookie_url)).await?;
        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("; ");

        let mut request = self.client.get(format!("{}/v1/test/getcrumb", self.base_url));
        if !cookie.is_empty() {
            request = request.header(COOKIE, cookie.as_str());
        }
        let response = self.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ProviderUnavailable(format!("crumb request failed with HTTP {}", status)));
        }

        let value = response.text().await?.trim().to_string();
        if value.is_empty() || value.contains('<') {
            return Err(FetchError::ProviderUnavailable("provider returned no crumb".to_string()));
        }

        info!(has_cookie = !cookie.is_empty(), "Yahoo crumb acquired");
        Ok(Crumb { cookie, value })
    }

    /// Cached crumb; a single handshake runs at a time
    async fn crumb(&self) -> std::result::Result<Crumb, FetchError> {
        let mut slot = self.crumb.lock().await;
        if let Some(crumb) = slot.as_ref() {
            return Ok(crumb.clone());
        }
        let crumb = self.handshake().await?;
        *slot = Some(crumb.clone());
        Ok(crumb)
    }

    async fn forget_crumb(&self, rejected: &Crumb) {
        let mut slot = self.crumb.lock().await;
        if slot.as_ref().is_some_and(|c| c.value == rejected.value) {
            *slot = None;
        }
    }

    async fn summary_request(&self, ticker: &str, crumb: &Crumb) -> std::result::Result<Response, FetchError> {
        let mut request = self
            .client
            .get(format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker))
            .query(&[("modules", SUMMARY_MODULES), ("crumb", crumb.value.as_str())]);
        if !crumb.cookie.is_empty() {
            request = request.header(COOKIE, crumb.cookie.as_str());
        }
        self.send(request).await
    }

    pub async fn chart(&self, ticker: &str, now: DateTime<Utc>) -> std::result::Result<TickerSnapshot, FetchError> {
        let request = self
            .client
            .get(format!("{}/v8/finance/chart/{}", self.base_url, ticker))
            .query(&[("range", "5d"), ("interval", "1d")]);
        let body = read_body(ticker, self.send(request).await?).await?;
        parse_chart_response(ticker, &body, now)
    }

    /// Five-year average dividend yield from the monthly chart with dividend events
    pub async fn dividend_yield_5y(&self, ticker: &str) -> std::result::Result<Option<f64>, FetchError> {
        let request = self
            .client
            .get(format!("{}/v8/finance/chart/{}", self.base_url, ticker))
            .query(&[("range", "5y"), ("interval", "1mo"), ("events", "div")]);
        let body = read_body(ticker, self.send(request).await?).await?;
        parse_dividend_history(ticker, &body)
    }

    /// quoteSummary with crumb auth; a rejected crumb is renewed once
    pub async fn quote_summary(&self, ticker: &str) -> std::result::Result<QuoteSummary, FetchError> {
        let crumb = self.crumb().await?;
        let mut response = self.summary_request(ticker, &crumb).await?;

        if is_auth_rejection(response.status()) {
            debug!(ticker = %ticker, status = %response.status(), "Crumb rejected, renewing");
            self.forget_crumb(&crumb).await;
            let crumb = self.crumb().await?;
            response = self.summary_request(ticker, &crumb).await?;
        }

        let body = read_body(ticker, response).await?;
        parse_summary_response(ticker, &body)
    }
}

#[async_trait]
impl QuoteProvider for YahooClient {
    async fn fetch_quote(&self, ticker: &str, now: DateTime<Utc>) -> std::result::Result<TickerSnapshot, FetchError> {
        if !self.enrich_quotes {
            return self.chart(ticker, now).await;
        }

        // Enrichment runs beside the chart call, each part under its own budget
        let budget = self.enrichment_timeout;
        let timed_out = || FetchError::ProviderUnavailable(format!("enrichment exceeded {:?}", budget));
        let enrichment = async {
            let (summary, dividends) = tokio::join!(
                tokio::time::timeout(budget, self.quote_summary(ticker)),
                tokio::time::timeout(budget, self.dividend_yield_5y(ticker)),
            );
            Ok::<_, FetchError>((
                summary.unwrap_or_else(|_| Err(timed_out())),
                dividends.unwrap_or_else(|_| Err(timed_out())),
            ))
        };
        let (snapshot, (summary, dividends)) = tokio::try_join!(self.chart(ticker, now), enrichment)?;

        let mut snapshot = match summary {
            Ok(summary) => summary.enrich(snapshot),
            Err(e) => {
                debug!(ticker = %ticker, error = %e, "Quote summary unavailable, serving bare quote");
                snapshot
            }
        };
        match dividends {
            Ok(avg) => snapshot.avg_dividend_yield_5y = avg,
            Err(e) => debug!(ticker = %ticker, error = %e, "Dividend history unavailable"),
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl ProfileProvider for YahooClient {
    async fn fetch_profile(&self, ticker: &str) -> std::result::Result<StockMetadataRecord, FetchError> {
        let summary = self.quote_summary(ticker).await?;
        Ok(summary.to_record(ticker))
    }
}
