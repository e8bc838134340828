#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ktop::{Exchange, FetchError, FetcherConfig, FieldSet, MarketPageFetcher, Page, PageClient};

pub const MOCK_BASE_URL: &str = "http://listing.test/sise/sise_market_sum.naver";

const HEADERS: [&str; 17] = [
    "N",
    "종목명",
    "현재가",
    "전일비",
    "등락률",
    "액면가",
    "시가총액",
    "PER",
    "PBR",
    "EPS",
    "외국인비율",
    "외국인순매수량",
    "기관순매수량",
    "매출액",
    "영업이익",
    "당기순이익",
    "토론실",
];

/// Serves EUC-KR encoded bodies by exact URL and records every request.
#[derive(Clone, Default)]
pub struct FixtureClient {
    responses: Arc<HashMap<String, Vec<u8>>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl FixtureClient {
    pub fn new(pages: Vec<(String, String)>) -> Self {
        let responses: HashMap<String, Vec<u8>> = pages
            .into_iter()
            .map(|(url, html)| {
                let (bytes, _, _) = encoding_rs::EUC_KR.encode(&html);
                (url, bytes.into_owned())
            })
            .collect();
        Self {
            responses: Arc::new(responses),
            requested: Arc::default(),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .expect("request log lock should not be poisoned")
            .clone()
    }
}

impl PageClient for FixtureClient {
    fn get_page(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requested
            .lock()
            .expect("request log lock should not be poisoned")
            .push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::HttpRequest {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })
    }
}

pub fn fixture_config() -> FetcherConfig {
    FetcherConfig {
        base_url: MOCK_BASE_URL.to_string(),
        field_set: FieldSet::Full,
        ..FetcherConfig::default()
    }
}

pub fn page_url(exchange: Exchange, page: Page) -> String {
    let probe = MarketPageFetcher::with_client(FixtureClient::default(), fixture_config());
    probe.page_url(exchange, page)
}

/// Both pages of one exchange, ranks 1..=50 and 51..=100.
pub fn two_page_fetcher(exchange: Exchange) -> (MarketPageFetcher<FixtureClient>, FixtureClient) {
    let client = FixtureClient::new(vec![
        (page_url(exchange, Page::First), listing_html(1..=50)),
        (page_url(exchange, Page::Second), listing_html(51..=100)),
    ]);
    let fetcher = MarketPageFetcher::with_client(client.clone(), fixture_config());
    (fetcher, client)
}

pub fn failing_fetcher() -> MarketPageFetcher<FixtureClient> {
    MarketPageFetcher::with_client(FixtureClient::default(), fixture_config())
}

/// Rank `r` moves up when `r % 3 == 0`, down when `r % 3 == 1`, flat otherwise.
pub fn expected_sign(rank: u32) -> i8 {
    match rank % 3 {
        0 => 1,
        1 => -1,
        _ => 0,
    }
}

pub fn listing_html(ranks: impl IntoIterator<Item = u32>) -> String {
    let colspan = HEADERS.len();
    let mut out = String::new();
    out.push_str("<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=euc-kr\"></head><body>");
    out.push_str("<table class=\"type_1\"><tr><td>검색</td></tr></table>");
    out.push_str("<table class=\"type_2\" summary=\"시가총액 리스트\"><thead><tr>");
    for header in HEADERS {
        out.push_str(&format!("<th scope=\"col\">\n\t{header}\n</th>"));
    }
    out.push_str("</tr></thead><tbody>");
    out.push_str(&format!(
        "<tr><td class=\"blank_08\" colspan=\"{colspan}\"></td></tr>"
    ));

    for (idx, rank) in ranks.into_iter().enumerate() {
        if idx > 0 && idx % 5 == 0 {
            out.push_str(&format!(
                "<tr><td class=\"division_line\" colspan=\"{colspan}\"></td></tr>"
            ));
        }
        out.push_str(&data_row(rank));
    }

    out.push_str(&format!(
        "<tr><td class=\"blank_08\" colspan=\"{colspan}\"></td></tr></tbody></table></body></html>"
    ));
    out
}

fn data_row(rank: u32) -> String {
    let (icon, pct) = match expected_sign(rank) {
        1 => (
            "<img src=\"https://ssl.pstatic.net/imgstock/images/images4/ico_up.gif\" width=\"7\" height=\"6\" alt=\"상승\">",
            format!("+1.{rank:02}%"),
        ),
        -1 => (
            "<img src=\"https://ssl.pstatic.net/imgstock/images/images4/ico_down.gif\" width=\"7\" height=\"6\" alt=\"하락\">",
            format!("-0.{rank:02}%"),
        ),
        _ => ("", "0.00%".to_string()),
    };
    let change = if expected_sign(rank) == 0 {
        "0".to_string()
    } else {
        format!("1,{rank:03}")
    };

    format!(
        "<tr onmouseover=\"mouseOver(this)\">\
         <td class=\"no\">{rank}</td>\
         <td><a href=\"/item/main.naver?code={code:06}\" class=\"tltle\">종목{rank}</a></td>\
         <td class=\"number\">{price},500</td>\
         <td class=\"number\">{icon}<span class=\"tah p11\">\n\t\t\t\t{change}\n\t\t\t</span></td>\
         <td class=\"number\"><span class=\"tah p11\">\n\t\t\t\t{pct}\n\t\t\t</span></td>\
         <td class=\"number\">100</td>\
         <td class=\"number\">{cap},000</td>\
         <td class=\"number\">12.{rank:02}</td>\
         <td class=\"number\">1.{rank:02}</td>\
         <td class=\"number\">5,{rank:03}</td>\
         <td class=\"number\">{rank}.50</td>\
         <td class=\"number\">-1,{rank:03}</td>\
         <td class=\"number\">2,{rank:03}</td>\
         <td class=\"number\">3,{rank:03}</td>\
         <td class=\"number\">{rank}00</td>\
         <td class=\"number\">-{rank}</td>\
         <td class=\"center\"><a href=\"/item/board.naver?code={code:06}\"><img src=\"ico_board.gif\" alt=\"토론실\"></a></td>\
         </tr>",
        code = rank * 10,
        price = 100 + rank,
        cap = 5_000 - rank * 10,
    )
}
