//! Dashboard page and its form actions
//!
//! Every POST applies its change to the session, leaves a notice for the next
//! render and redirects back to `/`.

use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::constants::SEARCH_RESULT_LIMIT;
use crate::error::AppError;
use crate::models::WatchlistError;
use crate::server::render::{render_dashboard, PageModel};
use crate::server::AppState;
use crate::services::session::{add_verified, NoticeLevel};

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub sector: String,
}

#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub ticker: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshForm {
    #[serde(default)]
    pub force: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    pub refresh_secs: u64,
    /// Checkbox; absent when unchecked
    #[serde(default)]
    pub auto_refresh: Option<String>,
}

fn is_checked(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("on") | Some("true") | Some("1"))
}

/// GET / - Dashboard page
#[instrument(skip(state))]
pub async fn index_handler(State(state): State<AppState>, Query(query): Query<IndexQuery>) -> impl IntoResponse {
    let (notices, watched) = {
        let mut session = state.session.write().await;
        (session.take_notices(), session.tickers())
    };

    let search_query = query.q.trim().to_string();
    let search_results = if search_query.is_empty() {
        Vec::new()
    } else {
        state.database.search_limited(&search_query, SEARCH_RESULT_LIMIT).await
    };

    let selected_sector = query.sector.trim().to_string();
    let sector_results = if selected_sector.is_empty() {
        Vec::new()
    } else {
        let mut records = state.database.by_sector(&selected_sector).await;
        records.truncate(SEARCH_RESULT_LIMIT);
        records
    };

    let page = PageModel {
        view: Some(state.view.read().await.clone()),
        notices,
        search_query,
        search_results,
        selected_sector,
        sectors: state.database.sectors().await,
        sector_results,
        database: Some(state.database.stats().await),
        watched,
    };

    Html(render_dashboard(&page))
}

/// POST /watchlist/add
#[instrument(skip(state))]
pub async fn add_handler(State(state): State<AppState>, Form(form): Form<AddForm>) -> Redirect {
    let result = add_verified(&state.session, &state.cache, &form.ticker).await;

    let mut session = state.session.write().await;
    match result {
        Ok(ticker) => {
            info!(ticker = %ticker, "Ticker added to watchlist");
            session.push_notice(NoticeLevel::Success, format!("{} adicionada com sucesso!", ticker));
            drop(session);
            state.trigger.request(false);
        }
        Err(WatchlistError::Duplicate(ticker)) => {
            session.push_notice(NoticeLevel::Warning, format!("{} já está na lista", ticker));
        }
        Err(WatchlistError::UnknownTicker(ticker)) => {
            session.push_notice(NoticeLevel::Error, format!("Ação {} não encontrada", ticker));
        }
        Err(WatchlistError::InvalidFormat(raw)) => {
            session.push_notice(
                NoticeLevel::Warning,
                format!("'{}' não é um código válido (ex.: PETR4.SA)", raw),
            );
        }
    }

    Redirect::to("/")
}

/// POST /watchlist/remove/{ticker}
#[instrument(skip(state))]
pub async fn remove_handler(State(state): State<AppState>, Path(ticker): Path<String>) -> Redirect {
    let removed = state.session.write().await.remove_ticker(&ticker);
    if removed {
        info!(ticker = %ticker, "Ticker removed from watchlist");
        state.trigger.request(false);
    }
    Redirect::to("/")
}

/// POST /refresh - Manual refresh, `force` refetches fresh quotes too
#[instrument(skip(state))]
pub async fn refresh_handler(State(state): State<AppState>, Form(form): Form<RefreshForm>) -> Redirect {
    state.trigger.request(is_checked(&form.force));
    Redirect::to("/")
}

/// POST /settings - Refresh interval and auto-refresh toggle
#[instrument(skip(state))]
pub async fn settings_handler(State(state): State<AppState>, Form(form): Form<SettingsForm>) -> Redirect {
    {
        let mut session = state.session.write().await;
        if let Err(e) = session.set_refresh_interval(form.refresh_secs) {
            warn!(error = %e, "Rejected refresh interval");
            session.push_notice(NoticeLevel::Warning, e.to_string());
        }
        session.set_auto_refresh(is_checked(&form.auto_refresh));
    }
    state.trigger.request(false);
    Redirect::to("/")
}

/// POST /database/update - Rescan the metadata source
#[instrument(skip(state))]
pub async fn database_update_handler(State(state): State<AppState>) -> Redirect {
    let result = state.database.update(state.metadata_source.clone()).await;

    let mut session = state.session.write().await;
    match result {
        Ok(report) => session.push_notice(
            NoticeLevel::Success,
            format!("Base de dados atualizada com {} ações!", report.total_stocks),
        ),
        Err(AppError::PartialUpdate { failed }) => session.push_notice(
            NoticeLevel::Error,
            format!(
                "Atualização cancelada: {} ações falharam ({}). A base anterior foi mantida.",
                failed.len(),
                failed.join(", ")
            ),
        ),
        Err(e) => session.push_notice(
            NoticeLevel::Error,
            format!("Erro na atualização: {}. A base anterior foi mantida.", e),
        ),
    }

    Redirect::to("/")
}
