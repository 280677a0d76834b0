//! National Library of Korea payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// ISBN (Seoji) record fields used for cataloging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SeojiRecord {
    pub author: String,
    /// 부가기호, printed after the ISBN in 020 $g
    pub ea_add_code: String,
    pub title: String,
    pub publisher: String,
}

/// Value of `key` regardless of case (`AUTHOR`, `author`, `Author`)
fn get_anycase<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).or_else(|| {
        obj.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn text_of(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    match get_anycase(obj, key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

impl SeojiRecord {
    fn from_doc(doc: &Value) -> Option<Self> {
        let obj = doc.as_object()?;
        Some(Self {
            author: text_of(obj, "AUTHOR"),
            ea_add_code: text_of(obj, "EA_ADD_CODE"),
            title: text_of(obj, "TITLE"),
            publisher: text_of(obj, "PUBLISHER"),
        })
    }

    /// First document of a Seoji response; `docs` is either a list or `{doc: [...]}`
    pub fn from_response(body: &Value) -> Option<Self> {
        let root = body.as_object()?;
        let docs = get_anycase(root, "docs")?;
        let first = match docs {
            Value::Array(list) => list.first(),
            Value::Object(obj) => match get_anycase(obj, "doc") {
                Some(Value::Array(list)) => list.first(),
                Some(single @ Value::Object(_)) => Some(single),
                _ => None,
            },
            _ => None,
        }?;
        Self::from_doc(first)
    }
}

/// How an original-script name was found through the NLK LOD
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LodProvenance {
    pub endpoints: Vec<String>,
    pub person_uri: Option<String>,
    pub matched_name: Option<String>,
    /// Up to 3 candidate person URIs
    pub candidates: Vec<String>,
    /// Up to 8 names of the chosen person
    pub sampled_names: Vec<LodName>,
}

/// `foaf:name` literal with its language tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LodName {
    pub name: String,
    pub lang: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_docs_as_list() {
        let body = json!({
            "TOTAL_COUNT": "1",
            "docs": [{"AUTHOR": "한강 지음", "EA_ADD_CODE": "03810", "TITLE": "소년이 온다"}]
        });
        let rec = SeojiRecord::from_response(&body).unwrap();
        assert_eq!(rec.author, "한강 지음");
        assert_eq!(rec.ea_add_code, "03810");
        assert_eq!(rec.publisher, "");
    }

    #[test]
    fn test_docs_as_object_with_lowercase_keys() {
        let body = json!({"docs": {"doc": [{"author": "김영하", "ea_add_code": 3810}]}});
        let rec = SeojiRecord::from_response(&body).unwrap();
        assert_eq!(rec.author, "김영하");
        assert_eq!(rec.ea_add_code, "3810");
    }

    #[test]
    fn test_empty_docs() {
        assert!(SeojiRecord::from_response(&json!({"docs": []})).is_none());
        assert!(SeojiRecord::from_response(&json!({"result": "none"})).is_none());
    }
}
