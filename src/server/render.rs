//! Server-side HTML for the dashboard page

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use chrono_tz::America::Sao_Paulo;

use crate::constants::{POPULAR_TICKERS, REFRESH_INTERVAL_CHOICES};
use crate::models::{DashboardView, DatabaseStats, RowStatus, StockMetadataRecord, Trend};
use crate::services::formatter::sector_icon;
use crate::services::session::{Notice, NoticeLevel};

/// Everything the page template needs besides the dashboard view
#[derive(Debug, Default)]
pub struct PageModel {
    pub view: Option<DashboardView>,
    pub notices: Vec<Notice>,
    pub search_query: String,
    pub search_results: Vec<StockMetadataRecord>,
    pub selected_sector: String,
    pub sectors: Vec<String>,
    pub sector_results: Vec<StockMetadataRecord>,
    pub database: Option<DatabaseStats>,
    pub watched: Vec<String>,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Sao_Paulo).format("%H:%M:%S").to_string()
}

fn local_datetime(at: DateTime<Utc>) -> String {
    at.with_timezone(&Sao_Paulo).format("%d/%m/%Y %H:%M").to_string()
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; display: flex; color: #1f2933; }
aside { width: 300px; padding: 1rem; background: #f3f4f6; min-height: 100vh; }
main { flex: 1; padding: 1rem 2rem; }
table { border-collapse: collapse; width: 100%; }
th, td { padding: .4rem .6rem; border-bottom: 1px solid #e5e7eb; text-align: right; }
th:first-child, td:first-child, td.name { text-align: left; }
.up { color: #15803d; } .down { color: #b91c1c; } .flat { color: #6b7280; }
.unavailable td { color: #9ca3af; font-style: italic; }
.metrics { display: flex; gap: 2rem; margin-bottom: 1rem; }
.metric strong { display: block; font-size: 1.4rem; }
.notice { padding: .5rem 1rem; margin-bottom: .5rem; border-radius: 4px; }
.notice.success { background: #dcfce7; } .notice.info { background: #dbeafe; }
.notice.warning { background: #fef9c3; } .notice.error { background: #fee2e2; }
form.inline { display: inline; }
"#;

fn render_notices(out: &mut String, notices: &[Notice]) {
    for notice in notices {
        let (class, icon) = match notice.level {
            NoticeLevel::Success => ("success", "✅"),
            NoticeLevel::Info => ("info", "ℹ️"),
            NoticeLevel::Warning => ("warning", "⚠️"),
            NoticeLevel::Error => ("error", "❌"),
        };
        let _ = write!(
            out,
            r#"<div class="notice {}">{} {}</div>"#,
            class,
            icon,
            escape_html(&notice.message)
        );
    }
}

fn render_sidebar(out: &mut String, page: &PageModel, view: &DashboardView) {
    out.push_str("<aside><h2>⚙️ Configurações</h2>");

    out.push_str(r#"<form method="post" action="/settings"><label>Intervalo de atualização <select name="refresh_secs">"#);
    for secs in REFRESH_INTERVAL_CHOICES {
        let selected = if *secs == view.refresh_secs { " selected" } else { "" };
        let _ = write!(out, r#"<option value="{0}"{1}>{0} s</option>"#, secs, selected);
    }
    let checked = if view.auto_refresh { " checked" } else { "" };
    let _ = write!(
        out,
        r#"</select></label><br><label><input type="checkbox" name="auto_refresh" value="on"{}> Auto-refresh</label>
<br><button type="submit">Aplicar</button></form>"#,
        checked
    );

    out.push_str(
        r#"<h3>➕ Adicionar ação</h3><form method="post" action="/watchlist/add">
<input name="ticker" list="popular" placeholder="PETR4.SA" required> <button type="submit">Adicionar</button>
<datalist id="popular">"#,
    );
    for ticker in POPULAR_TICKERS.iter().filter(|t| !page.watched.iter().any(|w| w == *t)) {
        let _ = write!(out, r#"<option value="{}">"#, ticker);
    }
    out.push_str("</datalist></form>");

    out.push_str(r#"<h3>🔎 Buscar</h3><form method="get" action="/">"#);
    let _ = write!(
        out,
        r#"<input name="q" value="{}" placeholder="nome, código ou indústria"> <select name="sector"><option value="">Todos os setores</option>"#,
        escape_html(&page.search_query)
    );
    for sector in &page.sectors {
        let selected = if *sector == page.selected_sector { " selected" } else { "" };
        let _ = write!(
            out,
            r#"<option value="{0}"{1}>{2} {0}</option>"#,
            escape_html(sector),
            selected,
            sector_icon(sector)
        );
    }
    out.push_str(r#"</select> <button type="submit">Buscar</button></form>"#);

    for record in page.search_results.iter().chain(page.sector_results.iter()) {
        let _ = write!(
            out,
            r#"<div><form class="inline" method="post" action="/watchlist/add"><input type="hidden" name="ticker" value="{0}"><button type="submit">+</button></form> <b>{0}</b> {1}</div>"#,
            escape_html(&record.ticker),
            escape_html(&record.company_name)
        );
    }

    out.push_str("<h3>🗄️ Base de dados</h3>");
    if let Some(stats) = &page.database {
        let updated = stats.last_updated.map(local_datetime).unwrap_or_else(|| "N/A".to_string());
        let status = if stats.cache_valid { "✅ Atualizada" } else { "⚠️ Desatualizada" };
        let _ = write!(
            out,
            "<p>{} ações, {} setores<br>Atualizada em {}<br>{}</p>",
            stats.total_stocks, stats.total_sectors, updated, status
        );
    }
    out.push_str(
        r#"<form method="post" action="/database/update"><button type="submit">🔄 Atualizar base de dados</button></form></aside>"#,
    );
}

fn render_table(out: &mut String, view: &DashboardView) {
    if view.rows.is_empty() {
        out.push_str("<p>Nenhuma ação na lista. Adicione ações pela barra lateral.</p>");
        return;
    }

    out.push_str(
        "<table><thead><tr><th>Ticker</th><th>Nome</th><th>Setor</th><th>Preço</th><th>Variação</th>\
<th>DY</th><th>DY Médio 5a</th><th>P/L</th><th>P/VP</th><th>Margem Líq.</th><th>Valor de Mercado</th><th>Volume</th><th></th></tr></thead><tbody>",
    );

    for row in &view.rows {
        let remove = format!(
            r#"<form class="inline" method="post" action="/watchlist/remove/{}"><button type="submit" title="Remover">🗑️</button></form>"#,
            escape_html(&row.ticker)
        );
        match &row.status {
            RowStatus::Available(m) => {
                let class = match m.trend {
                    Trend::Up => "up",
                    Trend::Down => "down",
                    Trend::Flat => "flat",
                };
                let _ = write!(
                    out,
                    r#"<tr><td>{}</td><td class="name">{}</td><td class="name">{} {}</td><td>{}</td><td class="{}">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                    escape_html(&row.ticker),
                    escape_html(&row.name),
                    row.sector_icon,
                    escape_html(&row.sector),
                    m.price,
                    class,
                    m.change,
                    m.dividend_yield,
                    m.avg_dividend_yield_5y,
                    m.pe_ratio,
                    m.pb_ratio,
                    m.profit_margin,
                    m.market_cap,
                    m.volume,
                    remove
                );
            }
            RowStatus::Unavailable { reason } => {
                let _ = write!(
                    out,
                    r#"<tr class="unavailable"><td>{}</td><td class="name">{}</td><td class="name">{} {}</td><td colspan="9">dados indisponíveis ({})</td><td>{}</td></tr>"#,
                    escape_html(&row.ticker),
                    escape_html(&row.name),
                    row.sector_icon,
                    escape_html(&row.sector),
                    escape_html(reason),
                    remove
                );
            }
        }
    }
    out.push_str("</tbody></table>");
}

/// Full dashboard page
pub fn render_dashboard(page: &PageModel) -> String {
    let empty = DashboardView::empty(REFRESH_INTERVAL_CHOICES[0], true);
    let view = page.view.as_ref().unwrap_or(&empty);

    let mut out = String::with_capacity(16 * 1024);
    out.push_str("<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\">");
    if view.auto_refresh {
        let _ = write!(out, r#"<meta http-equiv="refresh" content="{}">"#, view.refresh_secs);
    }
    let _ = write!(out, "<title>📈 Monitor de Ações B3</title><style>{}</style></head><body>", STYLE);

    render_sidebar(&mut out, page, view);

    out.push_str("<main><h1>📈 Monitor de Ações Brasileiras</h1>");
    render_notices(&mut out, &page.notices);

    let last_update = view.last_update.map(local_time).unwrap_or_else(|| "—".to_string());
    let refresh_status = if view.auto_refresh { "🔄 Ativo" } else { "⏸️ Pausado" };
    let market = if view.market_open { "🟢 Aberto" } else { "🔴 Fechado" };
    let _ = write!(
        out,
        r#"<div class="metrics"><div class="metric">📊 Ações monitoradas<strong>{}</strong></div>
<div class="metric">🕐 Última atualização<strong>{}</strong></div>
<div class="metric">Auto-refresh<strong>{}</strong></div>
<div class="metric">Mercado<strong>{}</strong></div>
<div class="metric">Indisponíveis<strong>{}</strong></div></div>"#,
        view.watched_count, last_update, refresh_status, market, view.unavailable_count
    );

    out.push_str(
        r#"<form class="inline" method="post" action="/refresh"><button type="submit">🔄 Atualizar agora</button></form>
<form class="inline" method="post" action="/refresh"><input type="hidden" name="force" value="true"><button type="submit">⚡ Forçar atualização</button></form>"#,
    );

    render_table(&mut out, view);
    out.push_str("</main></body></html>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RowMetrics, WatchlistRow};

    fn sample_view(auto_refresh: bool) -> DashboardView {
        let mut view = DashboardView::empty(5, auto_refresh);
        view.rows = vec![
            WatchlistRow {
                ticker: "PETR4.SA".to_string(),
                name: "Petrobras <PN>".to_string(),
                sector: "Energy".to_string(),
                sector_icon: "⚡",
                status: RowStatus::Available(RowMetrics {
                    price: "R$ 38,50".to_string(),
                    change: "+2,67%".to_string(),
                    trend: Trend::Up,
                    volume: "41.0M".to_string(),
                    market_cap: "500.0B".to_string(),
                    dividend_yield: "12,00%".to_string(),
                    avg_dividend_yield_5y: "9,50%".to_string(),
                    pe_ratio: "4,20".to_string(),
                    pb_ratio: "1,10".to_string(),
                    profit_margin: "25,00%".to_string(),
                    age_secs: 3,
                }),
            },
            WatchlistRow {
                ticker: "ZZZZ3.SA".to_string(),
                name: "ZZZZ3".to_string(),
                sector: "N/A".to_string(),
                sector_icon: "📊",
                status: RowStatus::Unavailable {
                    reason: "unknown ticker".to_string(),
                },
            },
        ];
        view.watched_count = 2;
        view.unavailable_count = 1;
        view
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_render_rows_and_auto_refresh() {
        let page = PageModel {
            view: Some(sample_view(true)),
            ..PageModel::default()
        };
        let html = render_dashboard(&page);

        assert!(html.contains(r#"<meta http-equiv="refresh" content="5">"#));
        assert!(html.contains("R$ 38,50"));
        assert!(html.contains("<th>DY Médio 5a</th>"));
        assert!(html.contains("<td>9,50%</td>"));
        assert!(html.contains(r#"class="up">+2,67%"#));
        assert!(html.contains("Petrobras &lt;PN&gt;"));
        assert!(html.contains("dados indisponíveis (unknown ticker)"));
        assert!(html.contains(r#"action="/watchlist/remove/ZZZZ3.SA""#));
        assert!(html.contains(r#"<option value="5" selected>"#));
    }

    #[test]
    fn test_paused_page_has_no_meta_refresh() {
        let page = PageModel {
            view: Some(sample_view(false)),
            notices: vec![Notice {
                level: NoticeLevel::Warning,
                message: "PETR4.SA já está na lista".to_string(),
            }],
            ..PageModel::default()
        };
        let html = render_dashboard(&page);
        assert!(!html.contains("http-equiv=\"refresh\""));
        assert!(html.contains("⏸️ Pausado"));
        assert!(html.contains(r#"class="notice warning""#));
    }

    #[test]
    fn test_popular_suggestions_skip_watched() {
        let page = PageModel {
            watched: vec!["ITUB4.SA".to_string()],
            ..PageModel::default()
        };
        let html = render_dashboard(&page);
        assert!(!html.contains(r#"<option value="ITUB4.SA">"#));
        assert!(html.contains(r#"<option value="MGLU3.SA">"#));
    }
}
