/// Number formatting convention for rendered values
///
/// `PtBr` is the Brazilian convention ("R$ 1.234,50"); `Plain` is the
/// locale-independent fallback ("R$ 1,234.50").
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberLocale {
    /// Brazilian Portuguese (default)
    #[serde(alias = "pt_br", alias = "br")]
    PtBr,

    /// Locale-independent fallback
    #[serde(alias = "en", alias = "c")]
    Plain,
}

impl Default for NumberLocale {
    fn default() -> Self {
        NumberLocale::PtBr
    }
}

impl NumberLocale {
    /// Parse from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "pt-br" | "pt_br" | "br" => Ok(NumberLocale::PtBr),
            "plain" | "en" | "c" => Ok(NumberLocale::Plain),
            _ => Err(format!("Invalid locale: '{}'. Valid values: pt-br, plain", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NumberLocale::PtBr => "pt-br",
            NumberLocale::Plain => "plain",
        }
    }

    /// (thousands separator, decimal separator)
    pub fn separators(&self) -> (char, char) {
        match self {
            NumberLocale::PtBr => ('.', ','),
            NumberLocale::Plain => (',', '.'),
        }
    }
}
