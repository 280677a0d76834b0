//! Aladin bookstore payloads

use serde::{Deserialize, Serialize};

/// Item from the Aladin ItemLookUp API (`output=js`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AladinItem {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub pub_date: String,
    pub category_name: String,
    pub description: String,
    pub full_description: String,
    pub isbn13: String,
    pub price_standard: Option<i64>,
    pub sub_info: SubInfo,
    pub series_info: Option<SeriesInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubInfo {
    pub sub_title: String,
    pub original_title: String,
    pub toc: String,
    pub item_page: Option<i64>,
    pub authors: Vec<AuthorEntry>,
}

/// Entry of `subInfo.authors`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorEntry {
    pub author_name: String,
    /// Korean role label, e.g. 지은이, 옮긴이
    pub author_type_name: String,
    /// English role code, e.g. author, translator
    pub author_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeriesInfo {
    pub series_id: Option<serde_json::Value>,
    pub series_name: String,
    pub volume: Option<String>,
}

/// Envelope of an ItemLookUp response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AladinLookupResponse {
    pub item: Vec<AladinItem>,
    #[serde(rename = "errorCode")]
    pub error_code: Option<i64>,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

/// Facts scraped from the Aladin product page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AladinPage {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub original_title: String,
    /// List price, digits only
    pub price: String,
    pub category_text: String,
    /// Language read from the product info box (jpn, chi or eng)
    pub language_hint: Option<String>,
    /// Stripped strings of the info box (page count, size, weight)
    pub extent: Vec<String>,
}

impl AuthorEntry {
    pub fn role_label(&self) -> &str {
        if self.author_type_name.trim().is_empty() {
            self.author_type.trim()
        } else {
            self.author_type_name.trim()
        }
    }
}

impl SeriesInfo {
    fn has_id(&self) -> bool {
        match &self.series_id {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(serde_json::Value::Number(n)) => n.as_i64() != Some(0),
            Some(_) => true,
        }
    }
}

impl AladinItem {
    pub fn original_title(&self) -> &str {
        self.sub_info.original_title.trim()
    }

    pub fn series_name(&self) -> &str {
        self.series_info
            .as_ref()
            .map(|s| s.series_name.trim())
            .unwrap_or("")
    }

    pub fn series_volume(&self) -> Option<&str> {
        self.series_info
            .as_ref()
            .and_then(|s| s.volume.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Long description when requested through OptResult, else the short one
    pub fn description_text(&self) -> &str {
        if self.full_description.trim().is_empty() {
            &self.description
        } else {
            &self.full_description
        }
    }

    /// Signals that a trailing number in the title is a volume
    pub fn has_series_evidence(&self) -> bool {
        if let Some(series) = &self.series_info {
            if !series.series_name.trim().is_empty() || series.has_id() {
                return true;
            }
        }
        let orig = self.original_title();
        !orig.is_empty() && !orig.ends_with(|c: char| c.is_ascii_digit())
    }

    /// Short context handed to the name-order model
    pub fn name_context(&self) -> String {
        [
            ("originalTitle", self.original_title()),
            ("categoryName", self.category_name.trim()),
            ("publisher", self.publisher.trim()),
            ("pubDate", self.pub_date.trim()),
            ("seriesName", self.series_name()),
        ]
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOOKUP: &str = r#"{
        "version": "20131101",
        "item": [{
            "title": "죄와 벌 1",
            "author": "표도르 도스토옙스키 (지은이), 김연경 (옮긴이)",
            "pubDate": "2020-03-05",
            "isbn13": "9788937462788",
            "priceStandard": 13000,
            "categoryName": "국내도서>소설/시/희곡>러시아소설",
            "publisher": "민음사",
            "subInfo": {
                "subTitle": "",
                "originalTitle": "Преступление и наказание",
                "itemPage": 492,
                "authors": [
                    {"authorType": "author", "authorTypeName": "지은이", "authorName": "표도르 도스토옙스키"},
                    {"authorType": "translator", "authorTypeName": "옮긴이", "authorName": "김연경"}
                ]
            },
            "seriesInfo": {"seriesId": 2479, "seriesName": "세계문학전집"}
        }]
    }"#;

    #[test]
    fn test_parse_lookup() {
        let resp: AladinLookupResponse = serde_json::from_str(LOOKUP).unwrap();
        let item = &resp.item[0];
        assert_eq!(item.price_standard, Some(13000));
        assert_eq!(item.sub_info.authors.len(), 2);
        assert_eq!(item.sub_info.authors[1].role_label(), "옮긴이");
        assert_eq!(item.series_name(), "세계문학전집");
        assert!(item.has_series_evidence());
    }

    #[test]
    fn test_name_context_skips_empty() {
        let item = AladinItem {
            publisher: "민음사".into(),
            pub_date: "2020-03-05".into(),
            ..Default::default()
        };
        assert_eq!(item.name_context(), "publisher=민음사 | pubDate=2020-03-05");
    }

    #[test]
    fn test_series_evidence_from_original_title() {
        let mut item = AladinItem::default();
        assert!(!item.has_series_evidence());
        item.sub_info.original_title = "Dune Messiah".into();
        assert!(item.has_series_evidence());
        item.sub_info.original_title = "Dune 2".into();
        assert!(!item.has_series_evidence());
    }
}
