//! Parsing of the market-cap listing page into a [`ListingPage`].
//!
//! The listing is a single `table.type_2`. A plain cell-text conversion loses
//! two things the table encodes in markup: the sign of the day change (an
//! up/down icon next to the digits) and the security code (inside the name
//! anchor). Both are rebuilt from the raw rows and attached only when their
//! length lines up with the parsed rows.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::market::detail_link;

pub const NAME_COLUMN: &str = "종목명";
pub const CHANGE_COLUMN: &str = "전일비";
pub const DETAIL_LINK_COLUMN: &str = "상세페이지";

const LISTING_TABLE_SELECTOR: &str = "table.type_2";
const RAW_HEADER_ROWS: usize = 2;
const CHANGE_CELL_INDEX: usize = 3;
const NAME_CELL_INDEX: usize = 1;
const UP_ALT: &str = "상승";
const DOWN_ALT: &str = "하락";

/// One fetched listing page: trimmed headers plus rows of cell text.
///
/// An empty page (no headers, no rows) stands for a failed fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPage {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ListingPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|entry| entry == header)
    }

    pub fn column(&self, header: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(header)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Replaces (or appends) a whole column. Returns `false` and leaves the
    /// page untouched when `values` does not have exactly one entry per row.
    pub fn attach_column(&mut self, header: &str, values: Vec<String>) -> bool {
        if values.len() != self.rows.len() {
            debug!(
                component = "listing",
                event = "listing.column.dropped",
                column = header,
                expected = self.rows.len(),
                actual = values.len()
            );
            return false;
        }

        let idx = match self.column_index(header) {
            Some(idx) => idx,
            None => {
                self.headers.push(header.to_string());
                self.headers.len() - 1
            }
        };
        let width = self.headers.len();
        for (row, value) in self.rows.iter_mut().zip(values) {
            if row.len() < width {
                row.resize(width, String::new());
            }
            row[idx] = value;
        }
        true
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("listing table `{0}` not found in page")]
    TableNotFound(&'static str),
    #[error("listing table has no header row")]
    NoHeaders,
    #[error("listing table has no `{0}` column")]
    MissingColumn(&'static str),
    #[error("invalid selector `{0}`")]
    Selector(&'static str),
}

/// Decodes the listing body. The endpoint serves EUC-KR (CP949 in practice);
/// malformed bytes are replaced rather than rejected.
pub fn decode_euc_kr(bytes: &[u8]) -> Cow<'_, str> {
    let (text, had_errors) = encoding_rs::EUC_KR.decode_without_bom_handling(bytes);
    if had_errors {
        warn!(
            component = "listing",
            event = "listing.decode.lossy",
            bytes = bytes.len()
        );
    }
    text
}

pub fn parse_listing(html: &str) -> Result<ListingPage, ListingError> {
    let document = Html::parse_document(html);
    let table_sel = selector(LISTING_TABLE_SELECTOR)?;
    let tr_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or(ListingError::TableNotFound(LISTING_TABLE_SELECTOR))?;
    let raw_rows: Vec<ElementRef<'_>> = table.select(&tr_sel).collect();

    let headers: Vec<String> = raw_rows
        .iter()
        .map(|tr| {
            tr.select(&th_sel)
                .map(|th| cell_text(&th))
                .collect::<Vec<_>>()
        })
        .find(|cells| !cells.is_empty())
        .ok_or(ListingError::NoHeaders)?;

    let name_idx = headers
        .iter()
        .position(|entry| entry == NAME_COLUMN)
        .ok_or(ListingError::MissingColumn(NAME_COLUMN))?;

    let rows: Vec<Vec<String>> = raw_rows
        .iter()
        .filter_map(|tr| {
            let mut cells: Vec<String> = tr.select(&td_sel).map(|td| cell_text(&td)).collect();
            if cells.is_empty() {
                return None;
            }
            cells.resize(headers.len(), String::new());
            Some(cells)
        })
        .filter(|cells| !cells[name_idx].is_empty())
        .collect();

    let mut page = ListingPage { headers, rows };

    let data_rows = &raw_rows[RAW_HEADER_ROWS.min(raw_rows.len())..];
    let changes = reconstruct_changes(data_rows, &td_sel)?;
    page.attach_column(CHANGE_COLUMN, changes);
    let links = reconstruct_detail_links(data_rows, &td_sel)?;
    page.attach_column(DETAIL_LINK_COLUMN, links);

    Ok(page)
}

/// Formats the change cell as a signed, thousands-grouped amount.
///
/// `alt` is the embedded icon's alt text, if any.
pub fn signed_change(raw_text: &str, alt: Option<&str>) -> String {
    let digits: String = raw_text.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return "0".to_string();
    }

    let prefix = match alt {
        Some(alt) if alt.contains(UP_ALT) => "+",
        Some(alt) if alt.contains(DOWN_ALT) => "-",
        _ => "",
    };
    format!("{prefix}{}", group_digits(digits))
}

pub fn security_code(href: &str) -> Option<&str> {
    static CODE_RE: OnceLock<Regex> = OnceLock::new();
    let re = CODE_RE.get_or_init(|| Regex::new(r"code=(\d+)").expect("static regex"));
    re.captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Inserts `,` every three digits from the right.
pub(crate) fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn reconstruct_changes(
    data_rows: &[ElementRef<'_>],
    td_sel: &Selector,
) -> Result<Vec<String>, ListingError> {
    let img_sel = selector("img")?;
    let changes = data_rows
        .iter()
        .filter_map(|tr| {
            let cell = tr.select(td_sel).nth(CHANGE_CELL_INDEX)?;
            let raw = cell.text().collect::<String>();
            let alt = cell
                .select(&img_sel)
                .next()
                .and_then(|img| img.value().attr("alt"));
            Some(signed_change(raw.trim(), alt))
        })
        .collect();
    Ok(changes)
}

fn reconstruct_detail_links(
    data_rows: &[ElementRef<'_>],
    td_sel: &Selector,
) -> Result<Vec<String>, ListingError> {
    let a_sel = selector("a")?;
    let links = data_rows
        .iter()
        .filter_map(|tr| {
            let cell = tr.select(td_sel).nth(NAME_CELL_INDEX)?;
            let href = cell.select(&a_sel).next()?.value().attr("href")?;
            security_code(href).map(detail_link)
        })
        .collect();
    Ok(links)
}

fn selector(raw: &'static str) -> Result<Selector, ListingError> {
    Selector::parse(raw).map_err(|_| ListingError::Selector(raw))
}

fn cell_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
