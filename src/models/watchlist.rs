use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::constants::KNOWN_SUFFIXES;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum WatchlistError {
    #[error("Invalid ticker '{0}': expected a B3 code such as PETR4.SA")]
    InvalidFormat(String),

    #[error("{0} is already in the watchlist")]
    Duplicate(String),

    #[error("{0} was not found at the quote provider")]
    UnknownTicker(String),
}

/// Ordered set of watched tickers; insertion order is the display order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchlistState {
    tickers: Vec<String>,
}

impl WatchlistState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list, dropping invalid entries and later duplicates
    pub fn from_tickers<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = Self::new();
        for ticker in tickers {
            let _ = state.add(ticker.as_ref());
        }
        state
    }

    /// Validate and append; returns the normalized ticker
    pub fn add(&mut self, raw: &str) -> Result<String, WatchlistError> {
        let ticker = normalize_ticker(raw);
        if !is_valid_ticker(&ticker) {
            return Err(WatchlistError::InvalidFormat(raw.trim().to_string()));
        }
        if self.contains(&ticker) {
            return Err(WatchlistError::Duplicate(ticker));
        }
        self.tickers.push(ticker.clone());
        Ok(ticker)
    }

    /// Remove a ticker; returns whether it was present
    pub fn remove(&mut self, raw: &str) -> bool {
        let ticker = normalize_ticker(raw);
        let before = self.tickers.len();
        self.tickers.retain(|t| t != &ticker);
        self.tickers.len() != before
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.tickers.iter().any(|t| t == ticker)
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// Trim and uppercase user input
pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// B3 ticker rule: known suffix, 4-6 char code, four leading letters, alphanumeric tail
pub fn is_valid_ticker(ticker: &str) -> bool {
    let Some(code) = KNOWN_SUFFIXES
        .iter()
        .find_map(|suffix| ticker.strip_suffix(suffix))
    else {
        return false;
    };

    let len = code.chars().count();
    if !(4..=6).contains(&len) {
        return false;
    }

    code.chars().take(4).all(|c| c.is_ascii_alphabetic())
        && code.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tickers() {
        assert!(is_valid_ticker("PETR4.SA"));
        assert!(is_valid_ticker("KLBN11.SA"));
        assert!(is_valid_ticker("ENMA3B.SA"));
        assert!(!is_valid_ticker("PETR4"));
        assert!(!is_valid_ticker("PE4.SA"));
        assert!(!is_valid_ticker("1PETR.SA"));
        assert!(!is_valid_ticker("PETR-4.SA"));
        assert!(!is_valid_ticker("PETRBRAS4.SA"));
        assert!(!is_valid_ticker(".SA"));
    }

    #[test]
    fn test_add_normalizes_input() {
        let mut list = WatchlistState::new();
        assert_eq!(list.add("  petr4.sa "), Ok("PETR4.SA".to_string()));
        assert_eq!(list.tickers(), &["PETR4.SA".to_string()]);
    }

    #[test]
    fn test_duplicate_keeps_size_and_position() {
        let mut list = WatchlistState::from_tickers(["ITUB4.SA", "PETR4.SA", "VALE3.SA"]);
        let err = list.add("itub4.sa").unwrap_err();
        assert_eq!(err, WatchlistError::Duplicate("ITUB4.SA".to_string()));
        assert_eq!(list.len(), 3);
        assert_eq!(list.tickers()[0], "ITUB4.SA");
    }

    #[test]
    fn test_invalid_format_rejected() {
        let mut list = WatchlistState::new();
        assert!(matches!(list.add("AAPL"), Err(WatchlistError::InvalidFormat(_))));
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut list = WatchlistState::from_tickers(["ITUB4.SA", "PETR4.SA"]);
        assert!(!list.remove("VALE3.SA"));
        assert_eq!(list.len(), 2);
        assert!(list.remove("petr4.sa"));
        assert_eq!(list.tickers(), &["ITUB4.SA".to_string()]);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let list = WatchlistState::from_tickers(["ITUB4.SA", "invalid", "ITUB4.SA", "VALE3.SA"]);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"["ITUB4.SA","VALE3.SA"]"#);
    }
}
