//! Public publisher registries: KPIPA book database and the MCST publisher register

use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::{
    config::RegistryConfig,
    error::{AppError, AppResult},
    services::http::HttpClient,
};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static SEL_GRID_ITEM: Lazy<Selector> = Lazy::new(|| selector("a.book-grid-item"));
static SEL_DT: Lazy<Selector> = Lazy::new(|| selector("dt"));
static SEL_BOARD_ROW: Lazy<Selector> = Lazy::new(|| selector("table.board tbody tr"));
static SEL_TD: Lazy<Selector> = Lazy::new(|| selector("td"));

const PUBLISHER_LABEL: &str = "출판사 / 임프린트";
const TRADING: &str = "영업";

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Registered publisher row of the MCST register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McstEntry {
    pub reg_type: String,
    pub name: String,
    pub address: String,
    pub status: String,
}

/// Detail link of the first KPIPA search hit
pub fn parse_kpipa_search(html: &str, base: &Url) -> Option<Url> {
    let doc = Html::parse_document(html);
    let href = doc.select(&SEL_GRID_ITEM).next()?.value().attr("href")?;
    base.join(href).ok()
}

/// Text of the `dd` following the 출판사 / 임프린트 `dt`
pub fn parse_kpipa_detail(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let dt = doc
        .select(&SEL_DT)
        .find(|dt| element_text(*dt) == PUBLISHER_LABEL)?;
    dt.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "dd")
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Rows of the register that are still trading
pub fn parse_mcst_rows(html: &str) -> Vec<McstEntry> {
    let doc = Html::parse_document(html);
    doc.select(&SEL_BOARD_ROW)
        .filter_map(|row| {
            let cols: Vec<String> = row.select(&SEL_TD).map(element_text).collect();
            match cols.as_slice() {
                [reg_type, name, address, status, ..] => Some(McstEntry {
                    reg_type: reg_type.clone(),
                    name: name.clone(),
                    address: address.clone(),
                    status: status.clone(),
                }),
                _ => None,
            }
        })
        .filter(|e| e.status == TRADING)
        .collect()
}

#[derive(Clone)]
pub struct RegistryService {
    http: HttpClient,
    config: RegistryConfig,
}

impl RegistryService {
    pub fn new(http: HttpClient, config: RegistryConfig) -> Self {
        Self { http, config }
    }

    /// Full publisher text (`출판사 / 임프린트`) KPIPA holds for an ISBN
    pub async fn kpipa_publisher(&self, isbn: &str) -> AppResult<Option<String>> {
        let base = Url::parse(&self.config.kpipa_url)
            .map_err(|e| AppError::Internal(format!("KPIPA url: {}", e)))?;
        let search_url = base
            .join("/home/v3/addition/search")
            .map_err(|e| AppError::Internal(format!("KPIPA url: {}", e)))?;

        let html = self
            .http
            .get_text(
                search_url.as_str(),
                &[("ST", isbn), ("PG", "1"), ("PG2", "1"), ("DSF", "Y"), ("SO", "weight"), ("DT", "A")],
            )
            .await?;
        let Some(detail_url) = parse_kpipa_search(&html, &base) else {
            tracing::debug!(isbn, "KPIPA search returned no result");
            return Ok(None);
        };

        let detail = self.http.get_text(detail_url.as_str(), &[]).await?;
        Ok(parse_kpipa_detail(&detail))
    }

    /// Trading MCST registrations matching a publisher name
    pub async fn mcst_search(&self, publisher: &str) -> AppResult<Vec<McstEntry>> {
        let url = format!("{}/html/searchList.php", self.config.mcst_url.trim_end_matches('/'));
        let html = self
            .http
            .get_text(
                &url,
                &[
                    ("search_area", "전체"),
                    ("search_state", "1"),
                    ("search_kind", "1"),
                    ("search_type", "1"),
                    ("search_word", publisher),
                ],
            )
            .await?;
        Ok(parse_mcst_rows(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;

    const KPIPA_DETAIL: &str = r#"<html><body><dl class="info">
        <dt>ISBN</dt><dd>9788936434120</dd>
        <dt>출판사 / 임프린트</dt>
        <dd> 창비 / 창비교육 </dd>
        <dt>발행일</dt><dd>2014-05-19</dd>
    </dl></body></html>"#;

    const MCST_LIST: &str = r#"<table class="board"><thead><tr><th>구분</th></tr></thead><tbody>
        <tr><td>출판사</td><td>창비</td><td>경기도 파주시 회동길 184</td><td>폐업</td></tr>
        <tr><td>출판사</td><td>(주)창비</td><td>경기도 파주시 회동길 184</td><td>영업</td></tr>
        <tr><td colspan="4">검색 결과가 없습니다</td></tr>
    </tbody></table>"#;

    fn service(url: &str) -> RegistryService {
        let http = HttpClient::new(&HttpConfig {
            retries: 0,
            ..HttpConfig::default()
        })
        .unwrap();
        RegistryService::new(
            http,
            RegistryConfig {
                kpipa_url: url.to_string(),
                mcst_url: url.to_string(),
            },
        )
    }

    #[test]
    fn test_parse_kpipa_search() {
        let base = Url::parse("https://bnk.kpipa.or.kr").unwrap();
        let html = r#"<div><a class="book-grid-item" href="/home/v3/addition/adiBookDetail?BOOK_ID=1">x</a></div>"#;
        assert_eq!(
            parse_kpipa_search(html, &base).unwrap().as_str(),
            "https://bnk.kpipa.or.kr/home/v3/addition/adiBookDetail?BOOK_ID=1"
        );
        assert!(parse_kpipa_search("<div></div>", &base).is_none());
    }

    #[test]
    fn test_parse_kpipa_detail() {
        assert_eq!(parse_kpipa_detail(KPIPA_DETAIL).as_deref(), Some("창비 / 창비교육"));
        assert_eq!(parse_kpipa_detail("<dl><dt>ISBN</dt><dd>1</dd></dl>"), None);
    }

    #[test]
    fn test_parse_mcst_keeps_trading_rows() {
        let rows = parse_mcst_rows(MCST_LIST);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "(주)창비");
        assert_eq!(rows[0].address, "경기도 파주시 회동길 184");
    }

    #[tokio::test]
    async fn test_kpipa_follows_first_hit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/home/v3/addition/search")
            .match_query(mockito::Matcher::UrlEncoded("ST".into(), "9788936434120".into()))
            .with_body(r#"<a class="book-grid-item" href="/detail?id=7">소년이 온다</a>"#)
            .create_async()
            .await;
        server
            .mock("GET", "/detail")
            .match_query(mockito::Matcher::UrlEncoded("id".into(), "7".into()))
            .with_body(KPIPA_DETAIL)
            .create_async()
            .await;

        let svc = service(&server.url());
        assert_eq!(
            svc.kpipa_publisher("9788936434120").await.unwrap().as_deref(),
            Some("창비 / 창비교육")
        );
    }

    #[tokio::test]
    async fn test_mcst_search() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/html/searchList.php")
            .match_query(mockito::Matcher::UrlEncoded("search_word".into(), "창비".into()))
            .with_body(MCST_LIST)
            .create_async()
            .await;

        let rows = service(&server.url()).mcst_search("창비").await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
