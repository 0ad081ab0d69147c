pub mod api;
pub mod pages;
pub mod render;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::Result;
use crate::models::MonitorConfig;
use crate::services::metadata_source::MetadataSource;
use crate::services::session::SharedSession;
use crate::services::stock_database::SharedStockDatabase;
use crate::services::ticker_cache::SharedTickerCache;
use crate::worker::{RefreshTrigger, SharedHealthStats, SharedView};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: SharedTickerCache,
    pub session: SharedSession,
    pub database: SharedStockDatabase,
    pub metadata_source: Arc<dyn MetadataSource>,
    pub view: SharedView,
    pub health_stats: SharedHealthStats,
    pub trigger: Arc<RefreshTrigger>,
    pub config: Arc<MonitorConfig>,
}

// FromRef implementations to extract specific state components
impl FromRef<AppState> for SharedStockDatabase {
    fn from_ref(app_state: &AppState) -> SharedStockDatabase {
        app_state.database.clone()
    }
}

impl FromRef<AppState> for SharedHealthStats {
    fn from_ref(app_state: &AppState) -> SharedHealthStats {
        app_state.health_stats.clone()
    }
}

impl FromRef<AppState> for SharedView {
    fn from_ref(app_state: &AppState) -> SharedView {
        app_state.view.clone()
    }
}

pub fn router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/", get(pages::index_handler))
        .route("/watchlist/add", post(pages::add_handler))
        .route("/watchlist/remove/{ticker}", post(pages::remove_handler))
        .route("/refresh", post(pages::refresh_handler))
        .route("/settings", post(pages::settings_handler))
        .route("/database/update", post(pages::database_update_handler))
        .route("/api/view", get(api::view_handler))
        .route("/api/stocks", get(api::stocks_handler))
        .route("/health", get(api::health_handler))
        .layer(cors)
        .with_state(app_state)
}

/// Start the axum server
pub async fn serve(app_state: AppState, port: u16) -> Result<()> {
    tracing::info!("Starting b3monitor server");

    tracing::info!("Registering routes:");
    tracing::info!("  GET  /?q=petro&sector=Energy");
    tracing::info!("  POST /watchlist/add, /watchlist/remove/{{ticker}}");
    tracing::info!("  POST /refresh, /settings, /database/update");
    tracing::info!("  GET  /api/view, /api/stocks, /health");

    let app = router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
pub mod testing {
    //! Application state backed by a scripted provider

    use super::*;
    use crate::models::DashboardView;
    use crate::services::batch_fetcher::BatchFetcher;
    use crate::services::metadata_source::{ProviderMetadataSource, TickerListing};
    use crate::services::provider::testing::FakeProvider;
    use crate::services::session::{RefreshSettings, SessionContext};
    use crate::services::stock_database::StockDatabase;
    use crate::services::ticker_cache::TickerCache;
    use crate::worker::HealthStats;
    use std::time::Duration;
    use tokio::sync::RwLock;

    pub fn test_state() -> (AppState, tempfile::TempDir) {
        let provider = Arc::new(
            FakeProvider::new()
                .quote("PETR4.SA", 38.5, 37.5)
                .quote("WEGE3.SA", 50.0, 49.0),
        );
        let fetcher = BatchFetcher::new(provider.clone(), 5, Duration::from_secs(5));
        let cache = Arc::new(TickerCache::new(fetcher, chrono::Duration::seconds(30)));

        let dir = tempfile::tempdir().unwrap();
        let database = Arc::new(StockDatabase::open(
            dir.path().join("stock_database.json"),
            chrono::Duration::hours(24),
        ));
        // No profiles scripted, so every database update fails
        let source = ProviderMetadataSource::new(provider, TickerListing::Known, Duration::from_secs(1)).unwrap();

        let settings = RefreshSettings::default();
        let state = AppState {
            cache,
            session: SessionContext::new(settings).into_shared(),
            database,
            metadata_source: Arc::new(source),
            view: Arc::new(RwLock::new(DashboardView::empty(settings.interval_secs, settings.auto_refresh))),
            health_stats: Arc::new(RwLock::new(HealthStats::default())),
            trigger: RefreshTrigger::new(),
            config: Arc::new(MonitorConfig::default()),
        };
        (state, dir)
    }
}
