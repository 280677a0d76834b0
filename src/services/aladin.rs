//! Aladin bookstore: TTB lookup API, web search fallback, product page scraping

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::{
    config::AladinConfig,
    error::{AppError, AppResult},
    models::aladin::{AladinItem, AladinLookupResponse, AladinPage},
    services::http::HttpClient,
};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static SEL_BO3: Lazy<Selector> = Lazy::new(|| selector("a.bo3"));
static SEL_FIRST_CARD: Lazy<Selector> = Lazy::new(|| selector(".ss_book_box, .ss_book_list"));
static SEL_LINK: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static SEL_OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static SEL_OG_DESC: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:description"]"#));
static SEL_INFO_BOX: Lazy<Selector> =
    Lazy::new(|| selector("#Ere_prod_allwrap, #Ere_prod_mconts_wrap, #Ere_prod_titlewrap"));
static SEL_CRUMBS: Lazy<Selector> = Lazy::new(|| selector(".location, .path, .breadcrumb"));
static SEL_ORIGINAL: Lazy<Selector> = Lazy::new(|| selector("div.info_original"));
static SEL_PRICE: Lazy<Selector> = Lazy::new(|| selector("span.price2"));
static SEL_CATEGORIES: Lazy<Selector> = Lazy::new(|| selector("div.conts_info_list2 li"));
static SEL_INFO_LIST: Lazy<Selector> = Lazy::new(|| selector("div.conts_info_list1"));
static SEL_TITLE: Lazy<Selector> = Lazy::new(|| selector("span.Ere_bo_title"));
static SEL_SUBTITLE: Lazy<Selector> = Lazy::new(|| selector("span.Ere_sub1_title"));
static SEL_DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector("div.Ere_prod_mconts_R"));

static PRODUCT_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href=['"](/shop/wproduct\.aspx\?ItemId=\d+[^'"]*)['"]"#).expect("valid regex")
});
static INFO_AUTHOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:저자|지은이)\s*:\s*([^|·/]+)").expect("valid regex"));
static INFO_PUBLISHER: Lazy<Regex> = Lazy::new(|| Regex::new(r"출판사\s*:\s*([^|·/]+)").expect("valid regex"));
static INFO_PUBDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:출간일|출판일)\s*:\s*([0-9]{4}\.[0-9]{1,2}\.[0-9]{1,2})").expect("valid regex"));

fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn select_text(doc: &Html, sel: &Selector) -> String {
    doc.select(sel).next().map(element_text).unwrap_or_default()
}

fn meta_content(doc: &Html, sel: &Selector) -> String {
    doc.select(sel)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(clean_text)
        .unwrap_or_default()
}

/// Product URL of the first hit on a search result page
pub fn parse_search_page(html: &str, base: &Url) -> Option<Url> {
    let doc = Html::parse_document(html);
    let href = doc
        .select(&SEL_BO3)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
        .or_else(|| {
            PRODUCT_HREF
                .captures(html)
                .map(|caps| caps[1].replace("&amp;", "&"))
        })
        .or_else(|| {
            doc.select(&SEL_FIRST_CARD)
                .next()
                .and_then(|card| card.select(&SEL_LINK).next())
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        })?;
    base.join(&href).ok()
}

/// Minimal item from a product page reached through the web search
pub fn parse_item_page(html: &str, isbn: &str) -> AladinItem {
    let doc = Html::parse_document(html);
    let title = meta_content(&doc, &SEL_OG_TITLE);
    let description = meta_content(&doc, &SEL_OG_DESC);

    let mut item = AladinItem {
        title,
        description,
        isbn13: isbn.to_string(),
        ..Default::default()
    };

    if let Some(info) = doc.select(&SEL_INFO_BOX).next() {
        let text = element_text(info);
        let capture = |re: &Regex| re.captures(&text).map(|c| clean_text(&c[1])).unwrap_or_default();
        item.author = capture(&INFO_AUTHOR);
        item.publisher = capture(&INFO_PUBLISHER);
        item.pub_date = capture(&INFO_PUBDATE);
    }

    let crumbs: Vec<String> = doc.select(&SEL_CRUMBS).map(element_text).collect();
    item.category_name = crumbs.join(" > ");
    item
}

/// Original title, price, category, language and extent of a product page
pub fn parse_product_page(html: &str) -> AladinPage {
    let doc = Html::parse_document(html);

    let category_text = doc
        .select(&SEL_CATEGORIES)
        .map(element_text)
        .collect::<Vec<_>>()
        .join(" ");

    let (language_hint, extent) = match doc.select(&SEL_INFO_LIST).next() {
        Some(info) => {
            let strings: Vec<String> = info
                .text()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            let joined = strings.join(" ");
            let lang = if joined.contains("언어") {
                [("Japanese", "jpn"), ("Chinese", "chi"), ("English", "eng")]
                    .iter()
                    .find(|(label, _)| joined.contains(label))
                    .map(|(_, code)| code.to_string())
            } else {
                None
            };
            (lang, strings)
        }
        None => (None, Vec::new()),
    };

    AladinPage {
        title: select_text(&doc, &SEL_TITLE),
        subtitle: select_text(&doc, &SEL_SUBTITLE),
        description: select_text(&doc, &SEL_DESCRIPTION),
        original_title: select_text(&doc, &SEL_ORIGINAL),
        price: select_text(&doc, &SEL_PRICE)
            .chars()
            .filter(char::is_ascii_digit)
            .collect(),
        category_text,
        language_hint,
        extent,
    }
}

#[derive(Clone)]
pub struct AladinService {
    http: HttpClient,
    config: AladinConfig,
}

impl AladinService {
    pub fn new(http: HttpClient, config: AladinConfig) -> Self {
        Self { http, config }
    }

    /// First item of the TTB ItemLookUp API
    pub async fn lookup(&self, isbn: &str) -> AppResult<Option<AladinItem>> {
        let key = self
            .config
            .ttb_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Upstream("Aladin TTB key is not configured".to_string()))?;
        let id_type = if isbn.len() == 13 { "ISBN13" } else { "ISBN" };

        let body = self
            .http
            .get_text(
                &self.config.api_url,
                &[
                    ("ttbkey", key),
                    ("itemIdType", id_type),
                    ("ItemId", isbn),
                    ("output", "js"),
                    ("Version", "20131101"),
                    ("OptResult", "authors,categoryName,fulldescription,toc"),
                ],
            )
            .await?;

        let resp: AladinLookupResponse = serde_json::from_str(body.trim().trim_end_matches(';'))?;
        if let Some(code) = resp.error_code {
            return Err(AppError::Upstream(format!(
                "Aladin error {}: {}",
                code,
                resp.error_message.unwrap_or_default()
            )));
        }
        Ok(resp.item.into_iter().next())
    }

    /// Search page, then product page, when the API has nothing
    pub async fn search_by_web(&self, isbn: &str) -> AppResult<Option<AladinItem>> {
        let base = Url::parse(&self.config.web_url)
            .map_err(|e| AppError::Internal(format!("Aladin web url: {}", e)))?;
        let search_url = format!("{}/search/wsearchresult.aspx", self.config.web_url.trim_end_matches('/'));
        let query = format!("isbn:{}", isbn);
        let html = self
            .http
            .get_text(&search_url, &[("SearchTarget", "Book"), ("SearchWord", query.as_str())])
            .await?;

        let Some(product_url) = parse_search_page(&html, &base) else {
            tracing::warn!(isbn, "No product link on the Aladin search page");
            return Ok(None);
        };
        tracing::debug!(isbn, url = %product_url, "Following Aladin search hit");

        let html = self.http.get_text(product_url.as_str(), &[]).await?;
        let item = parse_item_page(&html, isbn);
        Ok((!item.title.is_empty()).then_some(item))
    }

    pub async fn product_page(&self, isbn: &str) -> AppResult<AladinPage> {
        let url = format!("{}/shop/wproduct.aspx", self.config.web_url.trim_end_matches('/'));
        let html = self.http.get_text(&url, &[("ISBN", isbn)]).await?;
        Ok(parse_product_page(&html))
    }
}
