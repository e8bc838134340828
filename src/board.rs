//! Top-100 board assembly: concatenation, column bookkeeping and numeric
//! normalisation of fetched listing pages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::listing::{group_digits, ListingPage, CHANGE_COLUMN, DETAIL_LINK_COLUMN};
use crate::market::Exchange;

pub const BOARD_ROW_LIMIT: usize = 100;
pub const RANK_COLUMN: &str = "N";
pub const CHANGE_PERCENT_COLUMN: &str = "등락률";

/// Source header → display header.
pub const COLUMN_RENAMES: [(&str, &str); 5] = [
    ("외국인비율", "외국인비중"),
    ("외국인순매수량", "외국인매매"),
    ("기관순매수량", "기관매매"),
    ("매출액", "매출"),
    ("당기순이익", "순이익"),
];

pub const TARGET_COLUMNS: [(&str, ColumnKind); 16] = [
    (RANK_COLUMN, ColumnKind::Rank),
    ("종목명", ColumnKind::Name),
    (DETAIL_LINK_COLUMN, ColumnKind::Link),
    ("현재가", ColumnKind::Integer),
    (CHANGE_COLUMN, ColumnKind::ChangeAmount),
    (CHANGE_PERCENT_COLUMN, ColumnKind::ChangePercent),
    ("시가총액", ColumnKind::Integer),
    ("PER", ColumnKind::Ratio),
    ("PBR", ColumnKind::Ratio),
    ("EPS", ColumnKind::Integer),
    ("외국인비중", ColumnKind::Percent),
    ("외국인매매", ColumnKind::Integer),
    ("기관매매", ColumnKind::Integer),
    ("매출", ColumnKind::Integer),
    ("영업이익", ColumnKind::Integer),
    ("순이익", ColumnKind::Integer),
];

const MISSING: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Rank,
    Name,
    Link,
    Integer,
    Ratio,
    Percent,
    ChangeAmount,
    ChangePercent,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Rank | Self::Integer | Self::Ratio | Self::Percent
        )
    }

    /// Only the change columns carry the up/down colour.
    pub fn is_colored(self) -> bool {
        matches!(self, Self::ChangeAmount | Self::ChangePercent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    /// Red for up, blue for down: the Korean market convention.
    pub fn css_color(self) -> Option<&'static str> {
        match self {
            Self::Up => Some("red"),
            Self::Down => Some("blue"),
            Self::Flat => None,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardColumn {
    pub label: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BoardCell {
    Text(String),
    Link(Option<String>),
    Number(Option<f64>),
}

impl BoardCell {
    pub fn display(&self, kind: ColumnKind) -> String {
        match self {
            Self::Text(text) if text.is_empty() => MISSING.to_string(),
            Self::Text(text) => text.clone(),
            Self::Link(link) => link.clone().unwrap_or_else(|| MISSING.to_string()),
            Self::Number(None) => MISSING.to_string(),
            Self::Number(Some(value)) => format_number(*value, kind),
        }
    }

    /// Unformatted value for data export; missing values are empty.
    pub fn raw(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Link(link) => link.clone().unwrap_or_default(),
            Self::Number(value) => value.map(|v| v.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardRow {
    pub cells: Vec<BoardCell>,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBoard {
    pub exchange: Exchange,
    pub columns: Vec<BoardColumn>,
    pub rows: Vec<BoardRow>,
    pub notices: Vec<String>,
}

impl MarketBoard {
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.label == label)
    }

    pub fn cell(&self, row: usize, label: &str) -> Option<&BoardCell> {
        let idx = self.column_index(label)?;
        self.rows.get(row)?.cells.get(idx)
    }

    pub fn display_row(&self, row: &BoardRow) -> Vec<String> {
        self.columns
            .iter()
            .zip(&row.cells)
            .map(|(column, cell)| cell.display(column.kind))
            .collect()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            exchange: self.exchange,
            columns: self.columns.iter().map(|c| c.label.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| SnapshotRow {
                    cells: self.display_row(row),
                    trend: row.trend,
                })
                .collect(),
            notices: self.notices.clone(),
        }
    }

    pub fn to_csv(&self) -> Result<String, BoardExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.columns.iter().map(|c| c.label.as_str()))?;
        for row in &self.rows {
            writer.write_record(row.cells.iter().map(BoardCell::raw))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| BoardExportError::Flush(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| BoardExportError::Flush(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub exchange: Exchange,
    pub columns: Vec<String>,
    pub rows: Vec<SnapshotRow>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub cells: Vec<String>,
    pub trend: Trend,
}

#[derive(Debug, Error)]
pub enum BoardExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV flush error: {0}")]
    Flush(String),
}

pub trait BoardSource: Send + Sync + 'static {
    fn load(&self, exchange: Exchange) -> MarketBoard;
}

/// Serves boards assembled from fixed listing pages.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBoardSource {
    pages: HashMap<Exchange, Vec<ListingPage>>,
}

impl InMemoryBoardSource {
    pub fn new(pages: HashMap<Exchange, Vec<ListingPage>>) -> Self {
        Self { pages }
    }

    pub fn with_pages(mut self, exchange: Exchange, pages: Vec<ListingPage>) -> Self {
        self.pages.insert(exchange, pages);
        self
    }
}

impl BoardSource for InMemoryBoardSource {
    fn load(&self, exchange: Exchange) -> MarketBoard {
        let pages = self.pages.get(&exchange).map(Vec::as_slice).unwrap_or(&[]);
        assemble_board(exchange, pages)
    }
}

pub fn assemble_board(exchange: Exchange, pages: &[ListingPage]) -> MarketBoard {
    let mut merged = concat_pages(pages);
    merged.rows.truncate(BOARD_ROW_LIMIT);
    rename_columns(&mut merged);

    let selected: Vec<(usize, BoardColumn)> = TARGET_COLUMNS
        .iter()
        .filter_map(|(label, kind)| {
            merged.column_index(label).map(|idx| {
                (
                    idx,
                    BoardColumn {
                        label: (*label).to_string(),
                        kind: *kind,
                    },
                )
            })
        })
        .collect();
    let change_pct_idx = merged.column_index(CHANGE_PERCENT_COLUMN);

    let rows: Vec<BoardRow> = merged
        .rows
        .iter()
        .map(|raw| {
            let cells = selected
                .iter()
                .map(|(idx, column)| to_cell(&raw[*idx], column.kind))
                .collect();
            let trend = change_pct_idx
                .map(|idx| classify_change(&raw[idx]))
                .unwrap_or(Trend::Flat);
            BoardRow { cells, trend }
        })
        .collect();

    let mut notices = Vec::new();
    if rows.len() < BOARD_ROW_LIMIT {
        notices.push(format!(
            "표시된 종목이 {}개로 {BOARD_ROW_LIMIT}개에 못 미칩니다. 일부 또는 전체 조회가 실패했을 수 있습니다.",
            rows.len()
        ));
    }

    info!(
        component = "board",
        event = "board.assemble.finish",
        exchange = exchange.label(),
        pages = pages.len(),
        rows = rows.len(),
        columns = selected.len()
    );

    MarketBoard {
        exchange,
        columns: selected.into_iter().map(|(_, column)| column).collect(),
        rows,
        notices,
    }
}

/// Stacks pages in order, aligning columns by header (first-seen order).
pub fn concat_pages(pages: &[ListingPage]) -> ListingPage {
    let mut headers: Vec<String> = Vec::new();
    for page in pages {
        for header in &page.headers {
            if !headers.contains(header) {
                headers.push(header.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(pages.iter().map(ListingPage::row_count).sum());
    for page in pages {
        let positions: Vec<Option<usize>> = headers
            .iter()
            .map(|header| page.column_index(header))
            .collect();
        for raw in &page.rows {
            rows.push(
                positions
                    .iter()
                    .map(|pos| {
                        pos.and_then(|idx| raw.get(idx))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect(),
            );
        }
    }

    ListingPage { headers, rows }
}

pub fn rename_columns(page: &mut ListingPage) {
    for header in page.headers.iter_mut() {
        if let Some((_, display)) = COLUMN_RENAMES
            .iter()
            .find(|(source, _)| *source == header.as_str())
        {
            *header = (*display).to_string();
        }
    }
}

/// Strips thousands separators and percent signs; anything unparseable is
/// missing, never zero.
pub fn coerce_number(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '%').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn coerce_rank(text: &str) -> i64 {
    coerce_number(text).map(|value| value.trunc() as i64).unwrap_or(0)
}

pub fn classify_change(text: &str) -> Trend {
    let cleaned: String = text.chars().filter(|c| *c != '%' && *c != '+').collect();
    match cleaned.trim().parse::<f64>() {
        Ok(value) if value > 0.0 => Trend::Up,
        Ok(value) if value < 0.0 => Trend::Down,
        _ => Trend::Flat,
    }
}

pub fn format_number(value: f64, kind: ColumnKind) -> String {
    match kind {
        ColumnKind::Rank => format!("{value:.0}"),
        ColumnKind::Ratio => format!("{value:.2}"),
        ColumnKind::Percent => format!("{value:.2}%"),
        _ => format_grouped(value, 0),
    }
}

/// Fixed decimals with `,` thousands separators.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let mut out = format!("{sign}{}", group_digits(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn to_cell(raw: &str, kind: ColumnKind) -> BoardCell {
    match kind {
        ColumnKind::Rank => BoardCell::Number(Some(coerce_rank(raw) as f64)),
        ColumnKind::Link if raw.is_empty() => BoardCell::Link(None),
        ColumnKind::Link => BoardCell::Link(Some(raw.to_string())),
        kind if kind.is_numeric() => BoardCell::Number(coerce_number(raw)),
        _ => BoardCell::Text(raw.to_string()),
    }
}
