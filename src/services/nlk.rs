//! National Library of Korea: Seoji ISBN records and the LOD SPARQL endpoint

use std::time::Duration;

use reqwest::header::ACCEPT;
use serde_json::Value;

use crate::{
    config::NlkConfig,
    error::{AppError, AppResult},
    models::nlk::{LodName, LodProvenance, SeojiRecord},
    repository::cache::NameCacheRepository,
    services::http::HttpClient,
    text::script::pick_non_hangul_label,
};

const SPARQL_JSON: &str = "application/sparql-results+json";

/// Person candidate from the LOD name search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LodPerson {
    pub uri: String,
    pub name: String,
}

/// Escape a value for a double-quoted SPARQL literal
pub fn sparql_literal(s: &str) -> String {
    s.trim().replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn search_persons_query(name_ko: &str, limit: usize) -> String {
    format!(
        r#"PREFIX nlon: <http://lod.nl.go.kr/ontology/>
PREFIX foaf: <http://xmlns.com/foaf/0.1/>
SELECT ?person ?name WHERE {{
  ?person a nlon:Author ; foaf:name ?name .
  FILTER(LANG(?name) = "ko")
  FILTER(CONTAINS(STR(?name), "{}"))
}}
LIMIT {}"#,
        sparql_literal(name_ko),
        limit
    )
}

pub fn person_names_query(uri: &str) -> String {
    format!(
        r#"PREFIX foaf: <http://xmlns.com/foaf/0.1/>
SELECT ?name (LANG(?name) AS ?lang) WHERE {{
  <{}> foaf:name ?name .
}}"#,
        uri.trim().replace(['<', '>'], "")
    )
}

/// `results.bindings` of a SPARQL JSON response
pub fn bindings(data: &Value) -> &[Value] {
    data.pointer("/results/bindings")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// `binding[var].value`, trimmed
pub fn binding_value<'a>(binding: &'a Value, var: &str) -> &'a str {
    binding
        .get(var)
        .and_then(|v| v.get("value"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
}

#[derive(Clone)]
pub struct NlkService {
    http: HttpClient,
    cache: NameCacheRepository,
    config: NlkConfig,
}

impl NlkService {
    pub fn new(http: HttpClient, cache: NameCacheRepository, config: NlkConfig) -> Self {
        Self { http, cache, config }
    }

    // =========================================================================
    // SEOJI
    // =========================================================================

    /// Seoji record of an ISBN, trying each endpoint in turn
    pub async fn seoji(&self, isbn: &str) -> AppResult<Option<SeojiRecord>> {
        let key = self
            .config
            .cert_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Upstream("NLK cert key is not configured".to_string()))?;

        let cache_key = format!("nlk|{}", isbn);
        if let Some(record) = self.cache.get::<SeojiRecord>(&cache_key).await? {
            return Ok(Some(record));
        }

        let mut last_err = None;
        let mut answered = false;
        for endpoint in &self.config.seoji_endpoints {
            let params = [
                ("cert_key", key),
                ("result_style", "json"),
                ("page_no", "1"),
                ("page_size", "1"),
                ("isbn", isbn),
            ];
            match self.http.get_json::<Value>(endpoint, &params).await {
                Ok(body) => {
                    answered = true;
                    if let Some(record) = SeojiRecord::from_response(&body) {
                        let ttl = Duration::from_secs(self.config.seoji_cache_ttl_secs.max(0) as u64);
                        self.cache.set(&cache_key, &record, Some(ttl)).await?;
                        return Ok(Some(record));
                    }
                    tracing::debug!(endpoint = %endpoint, isbn, "Seoji returned no documents");
                }
                Err(e) => {
                    tracing::debug!(endpoint = %endpoint, isbn, error = %e, "Seoji endpoint failed");
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }

    // =========================================================================
    // LOD
    // =========================================================================

    /// Run a SPARQL query; returns the endpoint that answered and the body
    pub async fn sparql(&self, query: &str) -> AppResult<(String, Value)> {
        let mut last_err = AppError::Upstream("No NLK LOD endpoint configured".to_string());
        let tries = self.config.lod_retries.max(1);
        for endpoint in &self.config.lod_endpoints {
            for i in 0..tries {
                let result = async {
                    let resp = self
                        .http
                        .client()
                        .post(endpoint)
                        .header(ACCEPT, SPARQL_JSON)
                        .form(&[("query", query), ("format", "json")])
                        .send()
                        .await?
                        .error_for_status()?;
                    let body = resp.text().await?;
                    Ok::<Value, AppError>(serde_json::from_str(&body)?)
                }
                .await;
                match result {
                    Ok(data) => return Ok((endpoint.clone(), data)),
                    Err(e) => {
                        tracing::debug!(endpoint = %endpoint, attempt = i + 1, error = %e, "NLK LOD query failed");
                        last_err = e;
                    }
                }
                if i + 1 < tries {
                    let delay = self.config.lod_backoff.powi(i as i32 + 1);
                    tokio::time::sleep(Duration::from_secs_f64(delay.max(0.0))).await;
                }
            }
        }
        Err(last_err)
    }

    pub async fn search_persons(&self, name_ko: &str, limit: usize) -> AppResult<(String, Vec<LodPerson>)> {
        let (endpoint, data) = self.sparql(&search_persons_query(name_ko, limit)).await?;
        let persons = bindings(&data)
            .iter()
            .map(|b| LodPerson {
                uri: binding_value(b, "person").to_string(),
                name: binding_value(b, "name").to_string(),
            })
            .filter(|p| !p.uri.is_empty())
            .collect();
        Ok((endpoint, persons))
    }

    pub async fn person_names(&self, uri: &str) -> AppResult<(String, Vec<LodName>)> {
        let (endpoint, data) = self.sparql(&person_names_query(uri)).await?;
        let names = bindings(&data)
            .iter()
            .map(|b| LodName {
                name: binding_value(b, "name").to_string(),
                lang: binding_value(b, "lang").to_string(),
            })
            .filter(|n| !n.name.is_empty())
            .collect();
        Ok((endpoint, names))
    }

    /// Non-Hangul name of the first LOD person matching `name_ko`
    pub async fn original_name(&self, name_ko: &str) -> AppResult<(Option<String>, LodProvenance)> {
        let (search_endpoint, candidates) = self.search_persons(name_ko, 10).await?;
        let mut prov = LodProvenance {
            endpoints: vec![search_endpoint],
            candidates: candidates.iter().take(3).map(|c| c.uri.clone()).collect(),
            ..Default::default()
        };
        let Some(chosen) = candidates.first() else {
            return Ok((None, prov));
        };

        let (fetch_endpoint, names) = self.person_names(&chosen.uri).await?;
        let best = pick_non_hangul_label(names.iter().map(|n| n.name.as_str()));

        prov.endpoints.push(fetch_endpoint);
        prov.person_uri = Some(chosen.uri.clone());
        prov.matched_name = Some(chosen.name.clone());
        prov.sampled_names = names.into_iter().take(8).collect();
        Ok((best, prov))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::repository::test_pool;
    use serde_json::json;

    async fn service(url: &str, cert_key: Option<&str>) -> NlkService {
        let http = HttpClient::new(&HttpConfig {
            retries: 0,
            ..HttpConfig::default()
        })
        .unwrap();
        let cache = NameCacheRepository::new(test_pool().await);
        NlkService::new(
            http,
            cache,
            NlkConfig {
                cert_key: cert_key.map(str::to_string),
                seoji_endpoints: vec![format!("{}/seoji-a", url), format!("{}/seoji-b", url)],
                lod_endpoints: vec![format!("{}/sparql", url)],
                lod_retries: 1,
                lod_backoff: 0.0,
                ..NlkConfig::default()
            },
        )
    }

    #[test]
    fn test_queries_escape_names() {
        let q = search_persons_query(r#"도스토"옙스키"#, 5);
        assert!(q.contains(r#"CONTAINS(STR(?name), "도스토\"옙스키")"#));
        assert!(q.ends_with("LIMIT 5"));
        assert!(person_names_query("http://lod.nl.go.kr/resource/KAC1").contains("<http://lod.nl.go.kr/resource/KAC1>"));
    }

    #[test]
    fn test_binding_helpers() {
        let data = json!({"results": {"bindings": [{"name": {"type": "literal", "value": " Толстой "}}]}});
        assert_eq!(bindings(&data).len(), 1);
        assert_eq!(binding_value(&bindings(&data)[0], "name"), "Толстой");
        assert_eq!(binding_value(&bindings(&data)[0], "lang"), "");
        assert!(bindings(&json!({})).is_empty());
    }

    #[tokio::test]
    async fn test_seoji_falls_through_endpoints_and_caches() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/seoji-a")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let working = server
            .mock("GET", "/seoji-b")
            .match_query(mockito::Matcher::UrlEncoded("isbn".into(), "9788937462788".into()))
            .with_body(r#"{"docs":[{"AUTHOR":"표도르 도스토옙스키 지음 ; 김연경 옮김","EA_ADD_CODE":"04890"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let svc = service(&server.url(), Some("key")).await;
        let record = svc.seoji("9788937462788").await.unwrap().unwrap();
        assert_eq!(record.ea_add_code, "04890");

        // second call is served from the cache
        let again = svc.seoji("9788937462788").await.unwrap().unwrap();
        assert_eq!(again, record);
        failing.assert_async().await;
        working.assert_async().await;
    }

    #[tokio::test]
    async fn test_seoji_without_key() {
        let svc = service("http://127.0.0.1:9", None).await;
        assert!(matches!(svc.seoji("9788937462788").await, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_original_name_from_lod() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/sparql")
            .match_body(mockito::Matcher::Regex("nlon%3AAuthor".into()))
            .with_body(
                json!({"results": {"bindings": [
                    {"person": {"value": "http://lod.nl.go.kr/resource/KAC1"}, "name": {"value": "톨스토이, 레프"}},
                    {"person": {"value": "http://lod.nl.go.kr/resource/KAC2"}, "name": {"value": "톨스토이, 알렉세이"}}
                ]}})
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", "/sparql")
            .match_body(mockito::Matcher::Regex("KAC1".into()))
            .with_body(
                json!({"results": {"bindings": [
                    {"name": {"value": "톨스토이, 레프"}, "lang": {"value": "ko"}},
                    {"name": {"value": "Tolstoy, Leo"}, "lang": {"value": "en"}},
                    {"name": {"value": "Толстой, Лев Николаевич"}, "lang": {"value": "ru"}}
                ]}})
                .to_string(),
            )
            .create_async()
            .await;

        let svc = service(&server.url(), Some("key")).await;
        let (best, prov) = svc.original_name("톨스토이").await.unwrap();
        assert_eq!(best.as_deref(), Some("Толстой, Лев Николаевич"));
        assert_eq!(prov.person_uri.as_deref(), Some("http://lod.nl.go.kr/resource/KAC1"));
        assert_eq!(prov.candidates.len(), 2);
        assert_eq!(prov.sampled_names.len(), 3);
        assert_eq!(prov.endpoints.len(), 2);
    }
}
