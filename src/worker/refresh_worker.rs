use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, RwLock};
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use crate::models::{DashboardView, QuoteBatch};
use crate::services::dashboard::{compute_view, ViewContext};
use crate::services::formatter::Formatter;
use crate::services::session::SharedSession;
use crate::services::stock_database::SharedStockDatabase;
use crate::services::ticker_cache::SharedTickerCache;
use crate::services::trading_hours::{is_trading_hours_at, TradingHours};

pub type SharedView = Arc<RwLock<DashboardView>>;
pub type SharedHealthStats = Arc<RwLock<HealthStats>>;

/// Health statistics reported by `/health` and `status`
#[derive(Clone, Debug, Default, Serialize)]
pub struct HealthStats {
    pub refresh_iteration_count: u64,
    pub last_refresh: Option<String>,
    pub last_tick_ms: u64,
    pub watched_tickers: usize,
    pub failed_tickers: usize,
    pub cached_tickers: usize,
    pub is_trading_hours: bool,
    pub trading_hours_timezone: String,
}

/// Wakes the refresh loop ahead of its schedule
#[derive(Debug, Default)]
pub struct RefreshTrigger {
    notify: Notify,
    force: AtomicBool,
}

impl RefreshTrigger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request a tick now; `force` refetches even fresh quotes
    pub fn request(&self, force: bool) {
        if force {
            self.force.store(true, Ordering::SeqCst);
        }
        self.notify.notify_one();
    }

    fn take_force(&self) -> bool {
        self.force.swap(false, Ordering::SeqCst)
    }

    async fn notified(&self) {
        self.notify.notified().await
    }
}

/// Drives the fetch and render phases of the dashboard
#[derive(Clone)]
pub struct RefreshScheduler {
    cache: SharedTickerCache,
    session: SharedSession,
    database: SharedStockDatabase,
    view: SharedView,
    health: SharedHealthStats,
    trigger: Arc<RefreshTrigger>,
    formatter: Formatter,
}

impl RefreshScheduler {
    pub fn new(
        cache: SharedTickerCache,
        session: SharedSession,
        database: SharedStockDatabase,
        view: SharedView,
        health: SharedHealthStats,
        trigger: Arc<RefreshTrigger>,
        formatter: Formatter,
    ) -> Self {
        Self {
            cache,
            session,
            database,
            view,
            health,
            trigger,
            formatter,
        }
    }

    /// Loop forever: tick, then wait for the interval or a manual trigger.
    ///
    /// A tick is awaited before the wait starts, so ticks never overlap.
    #[instrument(skip(self))]
    pub async fn run(self) {
        info!("Starting refresh worker");

        let mut iteration_count = 0u64;
        let mut woken = true;

        loop {
            let (settings, dirty) = {
                let mut session = self.session.write().await;
                (session.settings(), session.take_dirty())
            };
            let force = self.trigger.take_force();

            if settings.auto_refresh || woken || dirty || force {
                iteration_count += 1;
                self.tick_at(Utc::now(), force, iteration_count).await;
            } else {
                debug!("Refresh worker: auto-refresh paused, skipping tick");
            }

            woken = tokio::select! {
                _ = sleep(Duration::from_secs(settings.interval_secs)) => false,
                _ = self.trigger.notified() => true,
            };
        }
    }

    /// One fetch phase followed by one render phase
    pub async fn tick_at(&self, now: DateTime<Utc>, force: bool, iteration: u64) -> DashboardView {
        let loop_start = std::time::Instant::now();
        let tickers = self.session.read().await.tickers();

        let quotes: QuoteBatch = if force {
            self.cache.refresh_at(&tickers, now).await
        } else {
            self.cache.get_many_at(&tickers, now).await
        };
        let failed = quotes.values().filter(|q| q.is_err()).count();

        let mut metadata = HashMap::with_capacity(tickers.len());
        for ticker in &tickers {
            if let Some(record) = self.database.get(ticker).await {
                metadata.insert(ticker.clone(), record);
            }
        }

        let settings = {
            let mut session = self.session.write().await;
            session.mark_updated(now);
            session.settings()
        };

        let market_open = is_trading_hours_at(now);
        let ctx = ViewContext {
            formatter: self.formatter,
            settings,
            last_update: Some(now),
            now,
            market_open,
        };
        let view = compute_view(&tickers, &quotes, &metadata, &ctx);
        *self.view.write().await = view.clone();

        let cached = self.cache.len().await;
        let tick_ms = loop_start.elapsed().as_millis() as u64;
        {
            let mut health = self.health.write().await;
            health.refresh_iteration_count = iteration;
            health.last_refresh = Some(now.to_rfc3339());
            health.last_tick_ms = tick_ms;
            health.watched_tickers = tickers.len();
            health.failed_tickers = failed;
            health.cached_tickers = cached;
            health.is_trading_hours = market_open;
            health.trading_hours_timezone = TradingHours::default().timezone.to_string();
        }

        info!(
            iteration,
            tickers = tickers.len(),
            failed,
            forced = force,
            tick_ms,
            "Refresh worker: Tick completed"
        );
        view
    }
}
