use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DADOS_MERCADO_BASE_URL;

/// Descriptive metadata for one listed stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMetadataRecord {
    pub ticker: String,
    pub company_name: String,
    pub sector: String,
    pub isin: String,
    pub exchange: String,
    #[serde(default = "not_available")]
    pub industry: String,
    #[serde(default)]
    pub link: String,
}

fn not_available() -> String {
    "N/A".to_string()
}

impl StockMetadataRecord {
    /// Record with placeholder ISIN and listing link derived from the ticker
    pub fn new(ticker: &str, company_name: &str, sector: &str) -> Self {
        let code = ticker_code(ticker);
        Self {
            ticker: ticker.to_string(),
            company_name: company_name.to_string(),
            sector: sector.to_string(),
            isin: placeholder_isin(ticker),
            exchange: "B3".to_string(),
            industry: not_available(),
            link: format!("{}/acoes/{}", DADOS_MERCADO_BASE_URL, code.to_lowercase()),
        }
    }

    pub fn with_isin(mut self, isin: &str) -> Self {
        self.isin = isin.to_string();
        self
    }

    pub fn with_industry(mut self, industry: &str) -> Self {
        self.industry = industry.to_string();
        self
    }

    /// False for the "N/A" placeholder
    pub fn has_industry(&self) -> bool {
        let industry = self.industry.trim();
        !industry.is_empty() && industry != "N/A"
    }
}

/// Bare code of an exchange-qualified ticker ("PETR4.SA" -> "PETR4")
pub fn ticker_code(ticker: &str) -> &str {
    ticker.split('.').next().unwrap_or(ticker)
}

/// ISIN used when the provider does not report one
pub fn placeholder_isin(ticker: &str) -> String {
    format!("BR{}", ticker_code(ticker).to_uppercase())
}

/// On-disk JSON document of the metadata database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub total_stocks: usize,
    pub stocks: Vec<StockMetadataRecord>,
}

impl MetadataDocument {
    pub fn new(stocks: Vec<StockMetadataRecord>, last_updated: DateTime<Utc>) -> Self {
        Self {
            last_updated,
            total_stocks: stocks.len(),
            stocks,
        }
    }
}

/// Summary shown in the settings panel and the `status` command
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_stocks: usize,
    pub total_sectors: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub cache_valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let record = StockMetadataRecord::new("PETR4.SA", "Petrobras", "Energy");
        assert_eq!(record.isin, "BRPETR4");
        assert_eq!(record.exchange, "B3");
        assert_eq!(record.link, "https://www.dadosdemercado.com.br/acoes/petr4");
        assert_eq!(record.industry, "N/A");
        assert!(!record.has_industry());
        assert!(record.with_industry("Oil & Gas").has_industry());
    }

    #[test]
    fn test_document_missing_optional_fields() {
        let json = r#"{
            "last_updated": "2024-05-01T12:00:00Z",
            "stocks": [
                {"ticker": "VALE3.SA", "company_name": "Vale", "sector": "Mineração",
                 "isin": "BRVALEACNOR0", "exchange": "B3"}
            ]
        }"#;
        let doc: MetadataDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.stocks.len(), 1);
        assert_eq!(doc.stocks[0].industry, "N/A");
        assert_eq!(doc.stocks[0].link, "");
    }
}
