use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::constants::SEARCH_RESULT_LIMIT;
use crate::models::DatabaseStats;
use crate::server::AppState;
use crate::services::stock_database::SharedStockDatabase;
use crate::worker::{HealthStats, SharedHealthStats, SharedView};

/// GET /api/view - Last computed dashboard view
#[instrument(skip(view))]
pub async fn view_handler(State(view): State<SharedView>) -> impl IntoResponse {
    let view = view.read().await.clone();
    (StatusCode::OK, Json(view))
}

/// Query parameters for /api/stocks
#[derive(Debug, Default, Deserialize)]
pub struct StocksQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/stocks?q=petro&sector=Energy&limit=20
#[instrument(skip(database))]
pub async fn stocks_handler(
    State(database): State<SharedStockDatabase>,
    Query(params): Query<StocksQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(SEARCH_RESULT_LIMIT);
    let query = params.q.as_deref().map(str::trim).unwrap_or("");

    let mut records = match params.sector.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(sector) => {
            let mut by_sector = database.by_sector(sector).await;
            if !query.is_empty() {
                let needle = query.to_lowercase();
                by_sector.retain(|r| {
                    r.ticker.to_lowercase().contains(&needle) || r.company_name.to_lowercase().contains(&needle)
                });
            }
            by_sector
        }
        None => database.search(query).await,
    };
    records.truncate(limit);

    debug!(results = records.len(), "Returning stock query");
    (StatusCode::OK, Json(records))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub worker: HealthStats,
    pub database: DatabaseStats,
    pub worker_count: usize,
    pub locale: &'static str,
    pub current_system_time: String,
}

/// GET /health - Health statistics endpoint
#[instrument(skip(health_state, app_state))]
pub async fn health_handler(
    State(health_state): State<SharedHealthStats>,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    // Short timeout to avoid waiting on a tick holding the lock
    let worker = match tokio::time::timeout(std::time::Duration::from_millis(100), health_state.read()).await {
        Ok(health) => health.clone(),
        Err(_) => {
            warn!("Health stats lock timeout, using defaults");
            HealthStats::default()
        }
    };

    let response = HealthResponse {
        worker,
        database: app_state.database.stats().await,
        worker_count: app_state.config.worker_count,
        locale: app_state.config.locale.as_str(),
        current_system_time: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}
