//! ktop core crate.
//!
//! Current implemented scope:
//! - KOSPI / KOSDAQ listing URLs and field identifiers
//! - EUC-KR listing page parsing with signed change and detail link rebuild
//! - top-100 board assembly, numeric normalisation and trend colouring
//! - browser dashboard with JSON snapshot and CSV download

mod board;
mod config;
mod dashboard;
mod fetcher;
mod listing;
mod market;
mod observability;

pub use board::{
    assemble_board, classify_change, coerce_number, coerce_rank, concat_pages, format_grouped,
    format_number, rename_columns, BoardCell, BoardColumn, BoardExportError, BoardRow,
    BoardSnapshot, BoardSource, ColumnKind, InMemoryBoardSource, MarketBoard, SnapshotRow, Trend,
    BOARD_ROW_LIMIT, COLUMN_RENAMES, TARGET_COLUMNS,
};
pub use config::{dashboard_config_from_env, DashboardConfig, DEFAULT_DASHBOARD_ADDR};
pub use dashboard::{dashboard_router, render_dashboard_html, BoardQuery, DashboardError};
pub use fetcher::{
    FetchError, FetcherConfig, MarketPageFetcher, PageClient, ReqwestPageClient,
    BROWSER_USER_AGENT,
};
pub use listing::{
    decode_euc_kr, parse_listing, security_code, signed_change, ListingError, ListingPage,
    CHANGE_COLUMN, DETAIL_LINK_COLUMN, NAME_COLUMN,
};
pub use market::{
    detail_link, listing_url, parse_exchange, parse_field_set, parse_page, Exchange, FieldId,
    FieldSet, MarketError, Page, ALL_FIELDS, BOARD_PAGES, DETAIL_BASE_URL, LISTING_BASE_URL,
};
pub use observability::{
    init_logging, log_app_bind, log_app_start, log_source_selected, logging_config_from_env,
    LogFormat, LoggingConfig, LoggingInitError,
};
