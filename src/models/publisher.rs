//! Publisher, region and imprint tables

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Publisher with its registered address
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
    /// Matching key, see `normalize_publisher_name`
    pub normalized_name: String,
    pub address: String,
    pub phone: Option<String>,
}

/// Region name and its 008 country code
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Region {
    pub id: i64,
    pub region: String,
    pub country_code: String,
}

/// Imprint published under a parent publisher
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Imprint {
    pub id: i64,
    pub publisher_name: String,
    pub imprint_name: String,
    pub normalized_imprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePublisher {
    #[validate(length(min = 1, message = "Publisher name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRegion {
    #[validate(length(min = 1, message = "Region is required"))]
    pub region: String,
    #[validate(length(equal = 3, message = "Country code must be 3 characters"))]
    pub country_code: String,
}

/// Imprint to register, either as two names or as one `출판사 / 임프린트` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateImprint {
    pub publisher_name: Option<String>,
    pub imprint_name: Option<String>,
    pub entry: Option<String>,
}

impl CreateImprint {
    /// `(publisher, imprint)` with both parts present
    pub fn resolve(&self) -> AppResult<(String, String)> {
        let trimmed = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        if let (Some(publisher), Some(imprint)) =
            (trimmed(&self.publisher_name), trimmed(&self.imprint_name))
        {
            return Ok((publisher, imprint));
        }
        if let Some(entry) = trimmed(&self.entry) {
            if let Some((publisher, imprint)) = entry.split_once('/') {
                let (publisher, imprint) = (publisher.trim(), imprint.trim());
                if !publisher.is_empty() && !imprint.is_empty() {
                    return Ok((publisher.to_string(), imprint.to_string()));
                }
            }
        }
        Err(AppError::Validation(
            "Imprint needs publisher_name and imprint_name, or an entry '출판사 / 임프린트'".to_string(),
        ))
    }
}

/// Bulk load of the registry tables
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegistryImport {
    pub publishers: Vec<CreatePublisher>,
    pub regions: Vec<CreateRegion>,
    pub imprints: Vec<CreateImprint>,
}

/// Rows written by an import
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ImportReport {
    pub publishers: u64,
    pub regions: u64,
    pub imprints: u64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PublisherQuery {
    /// Substring of the publisher name
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LocationQuery {
    /// ISBN used for the KPIPA lookup
    pub isbn: Option<String>,
    /// Publisher name as printed, used when KPIPA has nothing
    pub publisher: Option<String>,
}

/// Which step of the waterfall found the place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LocationSource {
    #[serde(rename = "KPIPA_DB")]
    KpipaDb,
    #[serde(rename = "KPIPA_DB_ALIAS")]
    KpipaDbAlias,
    #[serde(rename = "IMPRINT→KPIPA")]
    ImprintKpipa,
    #[serde(rename = "KPIPA_DB_STAGE2")]
    KpipaDbStage2,
    #[serde(rename = "MCST")]
    Mcst,
    #[serde(rename = "FALLBACK")]
    Fallback,
    #[serde(rename = "ERROR")]
    Error,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KpipaDb => "KPIPA_DB",
            Self::KpipaDbAlias => "KPIPA_DB_ALIAS",
            Self::ImprintKpipa => "IMPRINT→KPIPA",
            Self::KpipaDbStage2 => "KPIPA_DB_STAGE2",
            Self::Mcst => "MCST",
            Self::Fallback => "FALLBACK",
            Self::Error => "ERROR",
        }
    }
}

/// Place of publication as resolved for 260 and 008
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublisherLocation {
    pub place_raw: String,
    pub place_display: String,
    pub country_code: String,
    pub resolved_publisher: Option<String>,
    pub source: LocationSource,
    pub debug: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imprint_from_names() {
        let req = CreateImprint {
            publisher_name: Some(" 창비 ".into()),
            imprint_name: Some("창비교육".into()),
            entry: None,
        };
        assert_eq!(req.resolve().unwrap(), ("창비".to_string(), "창비교육".to_string()));
    }

    #[test]
    fn test_imprint_from_entry() {
        let req = CreateImprint {
            entry: Some("문학동네 / 교유서가".into()),
            ..Default::default()
        };
        assert_eq!(req.resolve().unwrap(), ("문학동네".to_string(), "교유서가".to_string()));
    }

    #[test]
    fn test_imprint_incomplete() {
        let req = CreateImprint {
            entry: Some("문학동네".into()),
            ..Default::default()
        };
        assert!(req.resolve().is_err());
    }

    #[test]
    fn test_region_validation() {
        let ok = CreateRegion {
            region: "서울".into(),
            country_code: "ulk".into(),
        };
        assert!(ok.validate().is_ok());
        let bad = CreateRegion {
            region: "서울".into(),
            country_code: "ul".into(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_location_source_serializes_as_label() {
        let json = serde_json::to_string(&LocationSource::ImprintKpipa).unwrap();
        assert_eq!(json, "\"IMPRINT→KPIPA\"");
        assert_eq!(LocationSource::KpipaDbStage2.as_str(), "KPIPA_DB_STAGE2");
    }
}
