//! Display formatting for prices, changes and scaled amounts
//!
//! Brazilian output is assembled by hand so it never depends on the host locale.
//! Market cap and volume use a compact suffix form ("2.5B") in every locale.

use crate::models::NumberLocale;

const NOT_AVAILABLE: &str = "N/A";

/// Locale-bound formatter used when building the dashboard view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Formatter {
    locale: NumberLocale,
}

impl Formatter {
    pub fn new(locale: NumberLocale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> NumberLocale {
        self.locale
    }

    /// "R$ 1.234,50", negative as "-R$ 1.234,50"
    pub fn currency(&self, value: f64) -> String {
        if !value.is_finite() {
            return NOT_AVAILABLE.to_string();
        }
        let rounded = round2(value);
        let body = self.grouped(rounded.abs());
        if rounded < 0.0 {
            format!("-R$ {}", body)
        } else {
            format!("R$ {}", body)
        }
    }

    /// "+1,25%", "-3,20%" or "0,00%"
    pub fn percent(&self, value: f64) -> String {
        if !value.is_finite() {
            return NOT_AVAILABLE.to_string();
        }
        let rounded = round2(value);
        let body = self.decimal(rounded.abs());
        if rounded > 0.0 {
            format!("+{}%", body)
        } else if rounded < 0.0 {
            format!("-{}%", body)
        } else {
            format!("{}%", body)
        }
    }

    /// Two-decimal plain ratio (P/E, P/B)
    pub fn ratio(&self, value: f64) -> String {
        if !value.is_finite() {
            return NOT_AVAILABLE.to_string();
        }
        let rounded = round2(value);
        if rounded < 0.0 {
            format!("-{}", self.decimal(rounded.abs()))
        } else {
            self.decimal(rounded.abs())
        }
    }

    /// Rate without a leading "+" ("5,20%"), for yields and margins
    pub fn rate(&self, value: f64) -> String {
        if !value.is_finite() {
            return NOT_AVAILABLE.to_string();
        }
        format!("{}%", self.ratio(value))
    }

    pub fn currency_opt(&self, value: Option<f64>) -> String {
        value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| self.currency(v))
    }

    pub fn percent_opt(&self, value: Option<f64>) -> String {
        value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| self.percent(v))
    }

    pub fn ratio_opt(&self, value: Option<f64>) -> String {
        value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| self.ratio(v))
    }

    pub fn rate_opt(&self, value: Option<f64>) -> String {
        value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| self.rate(v))
    }

    /// Fixed two decimals with the locale's decimal separator
    fn decimal(&self, value: f64) -> String {
        let (_, decimal_sep) = self.locale.separators();
        let text = format!("{:.2}", value);
        text.replacen('.', &decimal_sep.to_string(), 1)
    }

    /// Two decimals with thousands grouping
    fn grouped(&self, value: f64) -> String {
        let (thousands_sep, decimal_sep) = self.locale.separators();
        let text = format!("{:.2}", value);
        let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let digits: Vec<char> = int_part.chars().collect();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(thousands_sep);
            }
            grouped.push(*c);
        }

        format!("{}{}{}", grouped, decimal_sep, frac_part)
    }
}

fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid "-0,00"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

const SCALE_UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

/// Scale by T/B/M/K with one decimal
fn scaled(value: f64) -> Option<String> {
    let abs = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };
    let mut idx = SCALE_UNITS.iter().position(|(divisor, _)| abs >= *divisor)?;
    // 999_999 would round to "1000.0K"
    if idx > 0 && (abs / SCALE_UNITS[idx].0 * 10.0).round() >= 10_000.0 {
        idx -= 1;
    }
    let (divisor, suffix) = SCALE_UNITS[idx];
    Some(format!("{}{:.1}{}", sign, abs / divisor, suffix))
}

/// "R$ 1.234,50" in the Brazilian convention
pub fn format_currency(value: f64) -> String {
    Formatter::default().currency(value)
}

/// "-3,20%" in the Brazilian convention
pub fn format_percent(value: f64) -> String {
    Formatter::default().percent(value)
}

pub fn format_ratio(value: f64) -> String {
    Formatter::default().ratio(value)
}

/// "2.5B"; values below one thousand keep two decimals
pub fn format_market_cap(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    scaled(value).unwrap_or_else(|| format!("{:.2}", value))
}

pub fn format_market_cap_opt(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), format_market_cap)
}

/// Share volume: "12.3M", integers below one thousand
pub fn format_volume(value: u64) -> String {
    let value = value as f64;
    scaled(value).unwrap_or_else(|| format!("{}", value as u64))
}

/// Icon shown next to a sector name
pub fn sector_icon(sector: &str) -> &'static str {
    match sector {
        "Technology" => "💻",
        "Financial Services" => "🏦",
        "Healthcare" => "🏥",
        "Consumer Defensive" => "🛒",
        "Communication Services" => "📱",
        "Energy" => "⚡",
        "Basic Materials" => "🏭",
        "Consumer Cyclical" => "🚗",
        "Real Estate" => "🏠",
        "Utilities" => "🔌",
        "Industrials" => "🏗️",
        _ => "📊",
    }
}
