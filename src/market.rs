//! Exchange selectors and listing endpoint URLs.
//!
//! Rules implemented:
//! - KOSPI maps to market code `0`, KOSDAQ to `1` (the `sosok` query value)
//! - each request asks for a fixed, ordered set of `fieldIds`
//! - only pages 1 and 2 of the listing are used (50 rows each)

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LISTING_BASE_URL: &str = "https://finance.naver.com/sise/sise_market_sum.naver";
pub const DETAIL_BASE_URL: &str = "https://finance.naver.com/item/main.naver";
pub const BOARD_PAGES: [Page; 2] = [Page::First, Page::Second];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Kospi,
    Kosdaq,
}

impl Exchange {
    pub fn market_code(self) -> &'static str {
        match self {
            Self::Kospi => "0",
            Self::Kosdaq => "1",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Kospi => "KOSPI",
            Self::Kosdaq => "KOSDAQ",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::Kospi => "kospi",
            Self::Kosdaq => "kosdaq",
        }
    }

    pub fn button_text(self) -> &'static str {
        match self {
            Self::Kospi => "🔵 코스피(KOSPI) TOP 100",
            Self::Kosdaq => "🔴 코스닥(KOSDAQ) TOP 100",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    First,
    Second,
}

impl Page {
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Per,
    Pbr,
    Eps,
    ForeignRate,
    ForeignBuyVolume,
    InstitutionBuyVolume,
    Sales,
    OperatingProfit,
    NetIncome,
}

impl FieldId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Per => "per",
            Self::Pbr => "pbr",
            Self::Eps => "eps",
            Self::ForeignRate => "frgn_rate",
            Self::ForeignBuyVolume => "frgn_buy_vol",
            Self::InstitutionBuyVolume => "inst_buy_vol",
            Self::Sales => "sales",
            Self::OperatingProfit => "operating_profit",
            Self::NetIncome => "net_income",
        }
    }
}

pub const ALL_FIELDS: [FieldId; 9] = [
    FieldId::Per,
    FieldId::Pbr,
    FieldId::Eps,
    FieldId::ForeignRate,
    FieldId::ForeignBuyVolume,
    FieldId::InstitutionBuyVolume,
    FieldId::Sales,
    FieldId::OperatingProfit,
    FieldId::NetIncome,
];

/// Which financial columns the listing request asks for.
///
/// `Basic` drops revenue, operating profit and net income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldSet {
    #[default]
    Full,
    Basic,
}

impl FieldSet {
    pub fn fields(self) -> &'static [FieldId] {
        match self {
            Self::Full => &ALL_FIELDS,
            Self::Basic => &ALL_FIELDS[..6],
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarketError {
    #[error("unsupported exchange: {0}")]
    UnsupportedExchange(String),
    #[error("invalid listing page: {0} (expected 1 or 2)")]
    InvalidPage(String),
    #[error("invalid field set: {0}")]
    InvalidFieldSet(String),
}

pub fn parse_exchange(input: &str) -> Result<Exchange, MarketError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "kospi" | "0" => Ok(Exchange::Kospi),
        "kosdaq" | "1" => Ok(Exchange::Kosdaq),
        _ => Err(MarketError::UnsupportedExchange(input.to_string())),
    }
}

pub fn parse_page(input: &str) -> Result<Page, MarketError> {
    match input.trim() {
        "1" => Ok(Page::First),
        "2" => Ok(Page::Second),
        other => Err(MarketError::InvalidPage(other.to_string())),
    }
}

pub fn parse_field_set(input: &str) -> Result<FieldSet, MarketError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "full" => Ok(FieldSet::Full),
        "basic" => Ok(FieldSet::Basic),
        _ => Err(MarketError::InvalidFieldSet(input.to_string())),
    }
}

pub fn listing_url(base: &str, exchange: Exchange, page: Page, fields: &[FieldId]) -> String {
    let mut url = format!(
        "{base}?sosok={}&page={}",
        exchange.market_code(),
        page.number()
    );
    for field in fields {
        url.push_str("&fieldIds=");
        url.push_str(field.as_str());
    }
    url
}

pub fn detail_link(code: &str) -> String {
    format!("{DETAIL_BASE_URL}?code={code}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_codes_match_sosok_values() {
        assert_eq!(Exchange::Kospi.market_code(), "0");
        assert_eq!(Exchange::Kosdaq.market_code(), "1");
    }

    #[test]
    fn parse_exchange_accepts_names_and_codes() {
        assert_eq!(parse_exchange("KOSPI"), Ok(Exchange::Kospi));
        assert_eq!(parse_exchange(" kosdaq "), Ok(Exchange::Kosdaq));
        assert_eq!(parse_exchange("0"), Ok(Exchange::Kospi));
        assert_eq!(parse_exchange("1"), Ok(Exchange::Kosdaq));
        assert_eq!(
            parse_exchange("konex"),
            Err(MarketError::UnsupportedExchange("konex".to_string()))
        );
    }

    #[test]
    fn parse_page_rejects_out_of_range() {
        assert_eq!(parse_page("1"), Ok(Page::First));
        assert_eq!(parse_page("2"), Ok(Page::Second));
        assert!(matches!(parse_page("3"), Err(MarketError::InvalidPage(_))));
        assert!(matches!(parse_page("0"), Err(MarketError::InvalidPage(_))));
    }

    #[test]
    fn full_listing_url_repeats_all_nine_field_ids_in_order() {
        let url = listing_url(
            LISTING_BASE_URL,
            Exchange::Kosdaq,
            Page::Second,
            FieldSet::Full.fields(),
        );

        assert_eq!(
            url,
            "https://finance.naver.com/sise/sise_market_sum.naver?sosok=1&page=2\
             &fieldIds=per&fieldIds=pbr&fieldIds=eps&fieldIds=frgn_rate\
             &fieldIds=frgn_buy_vol&fieldIds=inst_buy_vol&fieldIds=sales\
             &fieldIds=operating_profit&fieldIds=net_income"
        );
    }

    #[test]
    fn basic_field_set_omits_income_statement_fields() {
        let fields = FieldSet::Basic.fields();
        assert_eq!(fields.len(), 6);
        assert!(!fields.contains(&FieldId::Sales));
        assert!(!fields.contains(&FieldId::NetIncome));

        let url = listing_url("http://mock/list", Exchange::Kospi, Page::First, fields);
        assert!(url.starts_with("http://mock/list?sosok=0&page=1&fieldIds=per"));
        assert!(url.ends_with("&fieldIds=inst_buy_vol"));
    }

    #[test]
    fn detail_link_uses_item_main_page() {
        assert_eq!(
            detail_link("005930"),
            "https://finance.naver.com/item/main.naver?code=005930"
        );
    }
}
