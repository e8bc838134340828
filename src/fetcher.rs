//! Listing fetcher: one blocking GET per (exchange, page).

use reqwest::header::{REFERER, USER_AGENT};
use thiserror::Error;
use tracing::{info, warn};

use crate::board::{assemble_board, BoardSource, MarketBoard};
use crate::listing::{decode_euc_kr, parse_listing, ListingError, ListingPage};
use crate::market::{listing_url, Exchange, FieldSet, Page, BOARD_PAGES, LISTING_BASE_URL};

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    pub base_url: String,
    pub referer: String,
    pub field_set: FieldSet,
    /// `None` leaves the request without a timeout.
    pub http_timeout_ms: Option<u64>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: LISTING_BASE_URL.to_string(),
            referer: LISTING_BASE_URL.to_string(),
            field_set: FieldSet::Full,
            http_timeout_ms: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP client build error: {0}")]
    HttpClientBuild(String),
    #[error("HTTP request failed for {url}: {message}")]
    HttpRequest { url: String, message: String },
    #[error("listing parse error: {0}")]
    Listing(#[from] ListingError),
}

pub trait PageClient: Send + Sync + 'static {
    fn get_page(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Sends each request from a freshly built blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestPageClient {
    referer: String,
    http_timeout_ms: Option<u64>,
}

impl ReqwestPageClient {
    pub fn new(cfg: &FetcherConfig) -> Self {
        Self {
            referer: cfg.referer.clone(),
            http_timeout_ms: cfg.http_timeout_ms,
        }
    }

    fn client(&self) -> Result<reqwest::blocking::Client, FetchError> {
        reqwest::blocking::Client::builder()
            .timeout(self.http_timeout_ms.map(std::time::Duration::from_millis))
            .build()
            .map_err(|err| FetchError::HttpClientBuild(err.to_string()))
    }
}

impl PageClient for ReqwestPageClient {
    fn get_page(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client()?
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(REFERER, self.referer.as_str())
            .send()
            .map_err(|err| FetchError::HttpRequest {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpRequest {
                url: url.to_string(),
                message: format!("unexpected HTTP status {status}"),
            });
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|err| FetchError::HttpRequest {
                url: url.to_string(),
                message: err.to_string(),
            })
    }
}

pub struct MarketPageFetcher<C = ReqwestPageClient> {
    client: C,
    cfg: FetcherConfig,
}

impl MarketPageFetcher<ReqwestPageClient> {
    pub fn live(cfg: FetcherConfig) -> Self {
        let client = ReqwestPageClient::new(&cfg);
        Self { client, cfg }
    }
}

impl<C: PageClient> MarketPageFetcher<C> {
    pub fn with_client(client: C, cfg: FetcherConfig) -> Self {
        Self { client, cfg }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.cfg
    }

    pub fn page_url(&self, exchange: Exchange, page: Page) -> String {
        listing_url(
            &self.cfg.base_url,
            exchange,
            page,
            self.cfg.field_set.fields(),
        )
    }

    pub fn try_fetch(&self, exchange: Exchange, page: Page) -> Result<ListingPage, FetchError> {
        let url = self.page_url(exchange, page);
        info!(
            component = "fetcher",
            event = "listing.fetch.start",
            exchange = exchange.label(),
            page = page.number(),
            url = %url
        );

        let body = self.client.get_page(&url)?;
        let html = decode_euc_kr(&body);
        let listing = parse_listing(&html)?;

        info!(
            component = "fetcher",
            event = "listing.fetch.finish",
            exchange = exchange.label(),
            page = page.number(),
            rows = listing.row_count(),
            columns = listing.headers.len()
        );
        Ok(listing)
    }

    /// Any failure collapses to [`ListingPage::empty`]; callers read an empty
    /// page as "fetch failed", not "no securities".
    pub fn fetch(&self, exchange: Exchange, page: Page) -> ListingPage {
        self.try_fetch(exchange, page).unwrap_or_else(|err| {
            log_fetch_error(exchange, page, &err);
            ListingPage::empty()
        })
    }

    pub fn load_board(&self, exchange: Exchange) -> MarketBoard {
        let mut pages = Vec::with_capacity(BOARD_PAGES.len());
        let mut notices = Vec::new();

        for page in BOARD_PAGES {
            match self.try_fetch(exchange, page) {
                Ok(listing) => pages.push(listing),
                Err(err) => {
                    log_fetch_error(exchange, page, &err);
                    notices.push(format!("{}페이지 조회 실패: {err}", page.number()));
                    pages.push(ListingPage::empty());
                }
            }
        }

        let mut board = assemble_board(exchange, &pages);
        notices.append(&mut board.notices);
        board.notices = notices;
        board
    }
}

impl<C: PageClient> BoardSource for MarketPageFetcher<C> {
    fn load(&self, exchange: Exchange) -> MarketBoard {
        self.load_board(exchange)
    }
}

fn log_fetch_error(exchange: Exchange, page: Page, err: &FetchError) {
    warn!(
        component = "fetcher",
        event = "listing.fetch.error",
        exchange = exchange.label(),
        page = page.number(),
        error = %err
    );
}
