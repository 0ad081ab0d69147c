use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Regular session of the B3 cash equities market
pub struct TradingHours {
    pub start_hour: u32,      // 10 for 10am
    pub end_hour: u32,        // 18 for 6pm (closing call ends 17:55)
    pub timezone: &'static str, // "America/Sao_Paulo"
    pub weekdays_only: bool,
}

impl Default for TradingHours {
    fn default() -> Self {
        Self {
            start_hour: 10,
            end_hour: 18,
            timezone: "America/Sao_Paulo",
            weekdays_only: true,
        }
    }
}

/// Check if B3 is in its regular session right now
pub fn is_trading_hours() -> bool {
    is_trading_hours_at(Utc::now())
}

pub fn is_trading_hours_at(now_utc: DateTime<Utc>) -> bool {
    let config = TradingHours::default();

    let tz: Tz = match config.timezone.parse() {
        Ok(tz) => tz,
        Err(e) => {
            tracing::warn!("Failed to parse timezone '{}': {}", config.timezone, e);
            return false;
        }
    };

    let now_local = now_utc.with_timezone(&tz);

    if config.weekdays_only && matches!(now_local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }

    let current_hour = now_local.hour();
    current_hour >= config.start_hour && current_hour < config.end_hour
}
