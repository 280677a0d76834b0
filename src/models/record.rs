//! Conversion requests and results

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::marc::Field;
use crate::models::publisher::LocationSource;
use crate::text::people::Role;

/// One ISBN to convert, with optional holdings for 049
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct ConvertItem {
    #[validate(length(min = 10, max = 32, message = "ISBN must have 10 or 13 digits"))]
    pub isbn: String,
    /// 등록기호
    #[serde(default)]
    pub reg_mark: String,
    /// 등록번호
    #[serde(default)]
    pub reg_no: String,
    /// 별치기호
    #[serde(default)]
    pub copy_symbol: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ConvertRequest {
    #[validate(length(min = 1, message = "At least one ISBN is required"), nested)]
    pub items: Vec<ConvertItem>,
    /// Ask the language model for extra 940 readings
    pub use_ai_940: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ConvertQuery {
    pub reg_mark: Option<String>,
    pub reg_no: Option<String>,
    pub copy_symbol: Option<String>,
    pub use_ai_940: Option<bool>,
}

/// How one contributor's original-script name was looked up
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NameTrace {
    /// Name as written in Korean
    pub who: String,
    pub role: Option<Role>,
    /// LOD, Wikidata or Wikidata(REST)
    pub route: String,
    /// Lookup key actually sent
    pub key: String,
    pub qid: Option<String>,
    pub lang: Option<String>,
    pub source: String,
    pub value: Option<String>,
    pub reason: Option<String>,
    pub error: Option<String>,
    /// P27 citizenship claims, when known
    #[serde(default)]
    pub countries: Vec<String>,
    /// Dropped from 900, e.g. a Korean national
    #[serde(default)]
    pub filtered: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NameCandidates {
    pub nlk_first_author: Option<String>,
    pub aladin_primary_author: Option<String>,
}

/// What went into a record, for review
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ConversionMeta {
    pub title_a: String,
    pub has_n: bool,
    pub count_700: usize,
    pub count_900: usize,
    pub count_940: usize,
    pub candidates: NameCandidates,
    pub line_041: Option<String>,
    pub line_546: Option<String>,
    pub line_008: Option<String>,
    pub line_020: Option<String>,
    pub line_056: Option<String>,
    pub line_653: Option<String>,
    pub kdc_code: Option<String>,
    pub price_950: Option<String>,
    pub publisher_raw: String,
    pub pub_year: String,
    pub place_display: String,
    pub country_code: String,
    pub publisher_resolved: Option<String>,
    pub location_source: Option<LocationSource>,
    pub name_traces: Vec<NameTrace>,
    pub debug: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversionResult {
    pub isbn: String,
    /// Whole record as MRK text
    pub mrk: String,
    /// One MRK line per field
    pub lines: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub fields: Vec<Field>,
    pub meta: ConversionMeta,
}

/// Per-ISBN result of a batch
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversionOutcome {
    pub isbn: String,
    pub ok: bool,
    pub record: Option<ConversionResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchResponse {
    pub results: Vec<ConversionOutcome>,
}

impl BatchResponse {
    /// MRK of every converted record, separated by blank lines
    pub fn mrk_export(&self) -> String {
        self.results
            .iter()
            .filter_map(|r| r.record.as_ref())
            .map(|r| r.mrk.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(isbn: &str, mrk: Option<&str>) -> ConversionOutcome {
        ConversionOutcome {
            isbn: isbn.to_string(),
            ok: mrk.is_some(),
            record: mrk.map(|m| ConversionResult {
                isbn: isbn.to_string(),
                mrk: m.to_string(),
                lines: m.lines().map(str::to_string).collect(),
                fields: Vec::new(),
                meta: ConversionMeta::default(),
            }),
            error: mrk.is_none().then(|| "not found".to_string()),
        }
    }

    #[test]
    fn test_mrk_export_skips_failures() {
        let batch = BatchResponse {
            results: vec![
                outcome("1", Some("=007  ta\n=245  00$a가")),
                outcome("2", None),
                outcome("3", Some("=007  ta")),
            ],
        };
        assert_eq!(batch.mrk_export(), "=007  ta\n=245  00$a가\n\n=007  ta");
    }

    #[test]
    fn test_request_validation() {
        let empty = ConvertRequest {
            items: vec![],
            use_ai_940: None,
        };
        assert!(empty.validate().is_err());

        let short_isbn = ConvertRequest {
            items: vec![ConvertItem {
                isbn: "123".into(),
                ..Default::default()
            }],
            use_ai_940: None,
        };
        assert!(short_isbn.validate().is_err());

        let ok = ConvertRequest {
            items: vec![ConvertItem {
                isbn: "9788937462788".into(),
                ..Default::default()
            }],
            use_ai_940: Some(false),
        };
        assert!(ok.validate().is_ok());
    }
}
