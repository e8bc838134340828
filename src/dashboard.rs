//! Browser UI: trigger buttons, the colourised top-100 table, and its JSON and
//! CSV forms.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use chrono_tz::Asia::Seoul;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::board::{BoardCell, BoardExportError, BoardSource, ColumnKind, MarketBoard};
use crate::market::{parse_exchange, Exchange, MarketError};

const EXCHANGES: [Exchange; 2] = [Exchange::Kospi, Exchange::Kosdaq];
const LINK_HEADER: &str = "상세보기";
const LINK_TEXT: &str = "🔗 열기";
const LINK_HELP: &str = "클릭하면 네이버 증권으로 이동합니다";
const CHANGE_PERCENT_HELP: &str = "전일 대비 등락 비율";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardQuery {
    pub market: Option<String>,
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("missing `market` query parameter (kospi or kosdaq)")]
    MissingMarket,
    #[error(transparent)]
    InvalidMarket(#[from] MarketError),
    #[error("board worker failed: {0}")]
    Worker(String),
    #[error(transparent)]
    Export(#[from] BoardExportError),
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingMarket | Self::InvalidMarket(_) => StatusCode::BAD_REQUEST,
            Self::Worker(_) | Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(
                component = "dashboard",
                event = "http.error",
                error = %self
            );
        }
        (status, self.to_string()).into_response()
    }
}

#[derive(Clone)]
struct DashboardAppState {
    source: Arc<dyn BoardSource>,
}

pub fn dashboard_router(source: Arc<dyn BoardSource>) -> Router {
    Router::new()
        .route("/", get(get_index_html))
        .route("/board", get(get_board_html))
        .route("/board/snapshot", get(get_board_snapshot))
        .route("/board.csv", get(get_board_csv))
        .with_state(DashboardAppState { source })
}

pub fn render_dashboard_html(board: Option<&MarketBoard>) -> String {
    let now_kst = Utc::now()
        .with_timezone(&Seoul)
        .format("%Y-%m-%d %H:%M:%S KST")
        .to_string();

    let mut out = String::new();
    out.push_str("<!DOCTYPE html><html lang=\"ko\"><head><meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str("<title>국내 증시 TOP 100 통합 분석</title>\n");
    out.push_str("<style>:root{--bg:#f4f6f8;--card:#ffffff;--ink:#1b2228;--muted:#5f6a73;--line:#dde2e6;--head:#1d3349;--up:red;--down:blue}*{box-sizing:border-box}body{margin:0;color:var(--ink);font-family:\"Pretendard\",\"Apple SD Gothic Neo\",\"Malgun Gothic\",\"Segoe UI\",sans-serif;background:var(--bg);min-height:100vh}.shell{max-width:1600px;margin:0 auto;padding:20px 16px 28px}.hero{background:linear-gradient(135deg,#13293d 0%,#24506e 100%);color:#f5f9fc;border-radius:14px;padding:16px 20px}.hero h1{margin:0 0 8px;font-size:1.5rem}.hero-meta{display:flex;gap:16px;flex-wrap:wrap;font-size:.9rem;color:#d6e4ee}.actions{display:grid;grid-template-columns:1fr 1fr;gap:12px;margin-top:16px}.market-btn{display:block;text-align:center;padding:12px 10px;border-radius:10px;border:1px solid #c8d0d7;background:#fff;color:var(--ink);font-weight:700;text-decoration:none}.market-btn:hover{background:#eef3f7}.market-btn.active{border-color:#24506e;box-shadow:0 0 0 2px rgba(36,80,110,.25)}.notice{margin-top:12px;padding:10px 14px;border-radius:10px;background:#fff4e5;border:1px solid #f0c98a;color:#7a4b00;font-size:.88rem}.card{margin-top:16px;background:var(--card);border:1px solid #d3d9de;border-radius:14px;overflow:hidden}.table-wrap{overflow:auto;max-height:78vh}table{width:100%;border-collapse:collapse}thead th{position:sticky;top:0;z-index:2;background:var(--head);color:#f2f7f9;font-size:.8rem;padding:9px 10px;white-space:nowrap}tbody td{font-size:.85rem;padding:8px 10px;border-bottom:1px solid var(--line);white-space:nowrap;text-align:right}tbody tr:nth-child(even){background:#fafbfc}td.name,th.name{position:sticky;left:0;text-align:left}th.name{z-index:3}td.name{background:inherit;background-color:#fff;font-weight:600}td.link{text-align:center}td.up{color:var(--up)}td.down{color:var(--down)}.empty{padding:24px;text-align:center;color:var(--muted)}</style>\n");
    out.push_str("</head><body><main class=\"shell\">\n");
    out.push_str("<section class=\"hero\"><h1>📊 국내 증시 시가총액 TOP 100 (상세 지표 통합)</h1>");
    out.push_str("<div class=\"hero-meta\">");
    if let Some(board) = board {
        out.push_str(&format!(
            "<span>시장: {}</span><span>종목 수: {}</span>",
            board.exchange.label(),
            board.rows.len()
        ));
    }
    out.push_str(&format!(
        "<span>조회 시각: {}</span>",
        escape_html(&now_kst)
    ));
    out.push_str("</div></section>\n");

    out.push_str("<nav class=\"actions\">");
    for exchange in EXCHANGES {
        let active = board.map(|b| b.exchange == exchange).unwrap_or(false);
        out.push_str(&format!(
            "<a class=\"market-btn{}\" href=\"/board?market={}\">{}</a>",
            if active { " active" } else { "" },
            exchange.slug(),
            escape_html(exchange.button_text())
        ));
    }
    out.push_str("</nav>\n");

    if let Some(board) = board {
        for notice in &board.notices {
            out.push_str("<div class=\"notice\">");
            out.push_str(&escape_html(notice));
            out.push_str("</div>\n");
        }
        render_board_table(&mut out, board);
    }

    out.push_str("</main></body></html>\n");
    out
}

fn render_board_table(out: &mut String, board: &MarketBoard) {
    out.push_str("<section class=\"card\"><div class=\"table-wrap\">");
    if board.rows.is_empty() {
        out.push_str("<div class=\"empty\">표시할 데이터가 없습니다.</div></div></section>\n");
        return;
    }

    out.push_str("<table id=\"board-table\">\n<thead><tr>");
    for column in &board.columns {
        match column.kind {
            ColumnKind::Name => {
                out.push_str("<th class=\"name\">");
                out.push_str(&escape_html(&column.label));
            }
            ColumnKind::Link => {
                out.push_str(&format!("<th title=\"{}\">{LINK_HEADER}", escape_html(LINK_HELP)));
            }
            ColumnKind::ChangePercent => {
                out.push_str(&format!(
                    "<th title=\"{}\">{}",
                    escape_html(CHANGE_PERCENT_HELP),
                    escape_html(&column.label)
                ));
            }
            _ => {
                out.push_str("<th>");
                out.push_str(&escape_html(&column.label));
            }
        }
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>\n");

    for (idx, row) in board.rows.iter().enumerate() {
        out.push_str(&format!("<tr data-row=\"{idx}\">"));
        for ((column, cell), value) in board
            .columns
            .iter()
            .zip(&row.cells)
            .zip(board.display_row(row))
        {
            let class = match column.kind {
                ColumnKind::Name => "name",
                ColumnKind::Link => "link",
                kind if kind.is_colored() => row.trend.css_class(),
                _ => "",
            };
            out.push_str(&format!("<td class=\"{class}\">"));
            match (column.kind, cell) {
                (ColumnKind::Link, BoardCell::Link(Some(url))) => {
                    out.push_str(&format!(
                        "<a target=\"_blank\" rel=\"noopener noreferrer\" title=\"{}\" href=\"{}\">{LINK_TEXT}</a>",
                        escape_html(LINK_HELP),
                        escape_html(url)
                    ));
                }
                _ => out.push_str(&escape_html(&value)),
            }
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
    }

    out.push_str("</tbody></table></div></section>\n");
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn requested_exchange(query: &BoardQuery) -> Result<Exchange, DashboardError> {
    let raw = query.market.as_deref().ok_or(DashboardError::MissingMarket)?;
    Ok(parse_exchange(raw)?)
}

async fn load_board(
    state: &DashboardAppState,
    exchange: Exchange,
) -> Result<MarketBoard, DashboardError> {
    let source = Arc::clone(&state.source);
    tokio::task::spawn_blocking(move || source.load(exchange))
        .await
        .map_err(|err| DashboardError::Worker(err.to_string()))
}

async fn get_index_html() -> impl IntoResponse {
    Html(render_dashboard_html(None))
}

async fn get_board_html(
    State(state): State<DashboardAppState>,
    Query(query): Query<BoardQuery>,
) -> Result<Html<String>, DashboardError> {
    let exchange = requested_exchange(&query)?;
    info!(
        component = "dashboard",
        event = "http.board.request",
        exchange = exchange.label()
    );
    let board = load_board(&state, exchange).await?;
    Ok(Html(render_dashboard_html(Some(&board))))
}

async fn get_board_snapshot(
    State(state): State<DashboardAppState>,
    Query(query): Query<BoardQuery>,
) -> Result<impl IntoResponse, DashboardError> {
    let exchange = requested_exchange(&query)?;
    info!(
        component = "dashboard",
        event = "http.snapshot.request",
        exchange = exchange.label()
    );
    let board = load_board(&state, exchange).await?;
    Ok(Json(board.snapshot()))
}

async fn get_board_csv(
    State(state): State<DashboardAppState>,
    Query(query): Query<BoardQuery>,
) -> Result<impl IntoResponse, DashboardError> {
    let exchange = requested_exchange(&query)?;
    info!(
        component = "dashboard",
        event = "http.csv.request",
        exchange = exchange.label()
    );
    let board = load_board(&state, exchange).await?;
    let body = board.to_csv()?;
    let disposition = format!("attachment; filename=\"{}_top100.csv\"", exchange.slug());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
