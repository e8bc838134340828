mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::{failing_fetcher, two_page_fetcher};
use ktop::{dashboard_router, Exchange, InMemoryBoardSource, ListingPage};
use tower::util::ServiceExt;

fn live_like_app(exchange: Exchange) -> Router {
    let (fetcher, _) = two_page_fetcher(exchange);
    dashboard_router(Arc::new(fetcher))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn index_page_shows_both_trigger_buttons_without_table() {
    let (status, _, text) = get(live_like_app(Exchange::Kospi), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("🔵 코스피(KOSPI) TOP 100"));
    assert!(text.contains("🔴 코스닥(KOSDAQ) TOP 100"));
    assert!(!text.contains("board-table"));
}

#[tokio::test]
async fn board_page_renders_one_hundred_colored_rows() {
    let (status, _, text) = get(live_like_app(Exchange::Kospi), "/board?market=kospi").await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("<table id=\"board-table\">"));
    assert_eq!(text.matches("<tr data-row=").count(), 100);
    assert!(text.contains("<td class=\"down\">-1,001</td><td class=\"down\">-0.01%</td>"));
    assert!(text.contains("<td class=\"\">0</td><td class=\"\">0.00%</td>"));
    assert!(text.contains("<td class=\"up\">+1,003</td><td class=\"up\">+1.03%</td>"));
    assert!(text.contains("🔗 열기"));
    assert!(text.contains("market-btn active\" href=\"/board?market=kospi\""));
    assert!(!text.contains("class=\"notice\""));
}

#[tokio::test]
async fn snapshot_endpoint_returns_display_cells_and_trends() {
    let (status, content_type, text) = get(
        live_like_app(Exchange::Kosdaq),
        "/board/snapshot?market=KOSDAQ",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let rows = json["rows"].as_array().unwrap();

    assert_eq!(json["exchange"], "kosdaq");
    assert_eq!(json["columns"][0], "N");
    assert_eq!(rows.len(), 100);
    assert_eq!(rows[0]["cells"][0], "1");
    assert_eq!(rows[0]["trend"], "down");
    assert_eq!(rows[2]["trend"], "up");
    assert_eq!(rows[99]["cells"][0], "100");
}

#[tokio::test]
async fn csv_download_has_header_and_one_line_per_row() {
    let (status, content_type, text) =
        get(live_like_app(Exchange::Kospi), "/board.csv?market=0").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/csv; charset=utf-8"));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 101);
    assert!(lines[0].starts_with("N,종목명,상세페이지,현재가,전일비,등락률"));
    assert!(lines[1].starts_with(
        "1,종목1,https://finance.naver.com/item/main.naver?code=000010,101500,\"-1,001\",-0.01%,"
    ));
}

#[tokio::test]
async fn unknown_or_missing_market_is_a_bad_request() {
    let (status, _, text) = get(live_like_app(Exchange::Kospi), "/board?market=nyse").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("unsupported exchange: nyse"));

    let (status, _, _) = get(live_like_app(Exchange::Kospi), "/board/snapshot").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_fetch_renders_empty_board_with_visible_errors() {
    let app = dashboard_router(Arc::new(failing_fetcher()));
    let (status, _, text) = get(app, "/board?market=kosdaq").await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("1페이지 조회 실패"));
    assert!(text.contains("2페이지 조회 실패"));
    assert!(text.contains("표시할 데이터가 없습니다."));
}

#[tokio::test]
async fn in_memory_source_serves_preassembled_pages() {
    let page = ListingPage {
        headers: vec!["N".to_string(), "종목명".to_string(), "등락률".to_string()],
        rows: vec![vec!["1".to_string(), "셀트리온".to_string(), "+2.00%".to_string()]],
    };
    let source = InMemoryBoardSource::default().with_pages(Exchange::Kospi, vec![page]);
    let app = dashboard_router(Arc::new(source));

    let (status, _, text) = get(app, "/board/snapshot?market=kospi").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["rows"][0]["cells"][1], "셀트리온");
    assert_eq!(json["rows"][0]["trend"], "up");
    assert_eq!(json["notices"].as_array().unwrap().len(), 1);
}
