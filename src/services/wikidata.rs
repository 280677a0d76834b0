//! Wikidata: REST entity lookups, SPARQL name bundles, citizenship claims

use std::collections::BTreeMap;

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::WikidataConfig,
    error::AppResult,
    repository::cache::NameCacheRepository,
    services::{
        http::HttpClient,
        nlk::{binding_value, bindings, sparql_literal},
    },
    text::{
        names::{ko_name_variants, simple_reorder_family_given},
        script::pick_non_hangul_label,
    },
};

const ENTITY_PREFIX: &str = "http://www.wikidata.org/entity/";
const DEFAULT_LANGS: &[&str] = &["ja", "zh", "ru", "en", "ko"];
pub const KOREAN_P27: &[&str] = &["Q884", "Q423", "Q180"];

static CJK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{4E00}-\u{9FFF}\u{3040}-\u{30FF}\u{AC00}-\u{D7A3}]").expect("valid regex"));
static CYRILLIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{0400}-\u{04FF}]").expect("valid regex"));
static LATIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").expect("valid regex"));

const BUNDLE_VARS: &str = "?jaLabel ?zhLabel ?koLabel ?ruLabel ?enLabel ?nativeName ?country";

const PREFIXES: &str = "PREFIX wd:  <http://www.wikidata.org/entity/>
PREFIX wdt: <http://www.wikidata.org/prop/direct/>
PREFIX rdfs:<http://www.w3.org/2000/01/rdf-schema#>
PREFIX skos:<http://www.w3.org/2004/02/skos/core#>
";

const BUNDLE_OPTIONALS: &str = r#"
  OPTIONAL { ?author rdfs:label ?jaLabel FILTER (lang(?jaLabel) = "ja") }
  OPTIONAL { ?author rdfs:label ?zhLabel FILTER (lang(?zhLabel) = "zh") }
  OPTIONAL { ?author rdfs:label ?koLabel FILTER (lang(?koLabel) = "ko") }
  OPTIONAL { ?author rdfs:label ?ruLabel FILTER (lang(?ruLabel) = "ru") }
  OPTIONAL { ?author rdfs:label ?enLabel FILTER (lang(?enLabel) = "en") }
  OPTIONAL { ?author wdt:P1559 ?nativeName }
  OPTIONAL { ?author wdt:P27 ?country }"#;

/// Preferred label language for a citizenship claim
fn language_for_country(qid: &str) -> Option<&'static str> {
    match qid {
        "Q17" => Some("ja"),
        "Q148" => Some("zh"),
        "Q159" => Some("ru"),
        "Q142" => Some("fr"),
        "Q183" => Some("de"),
        "Q29" => Some("es"),
        "Q38" => Some("it"),
        "Q145" | "Q30" => Some("en"),
        _ => None,
    }
}

/// Label languages to try, citizenship languages first
pub fn preferred_languages(countries: &[String]) -> Vec<&'static str> {
    let mut langs: IndexSet<&'static str> = countries
        .iter()
        .filter_map(|c| language_for_country(c))
        .collect();
    langs.extend(DEFAULT_LANGS.iter().copied());
    langs.into_iter().collect()
}

pub fn is_korean_national(countries: &[String]) -> bool {
    countries.iter().any(|c| KOREAN_P27.contains(&c.as_str()))
}

/// Native-script and romanised names of the persons a label matched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameBundle {
    #[serde(default)]
    pub native: IndexSet<String>,
    #[serde(default)]
    pub roman: IndexSet<String>,
    #[serde(default)]
    pub countries: IndexSet<String>,
}

impl NameBundle {
    pub fn is_empty(&self) -> bool {
        self.native.is_empty() && self.roman.is_empty()
    }

    /// Fold one SPARQL row in; rows of Korean nationals add nothing
    fn absorb(&mut self, b: &Value) {
        if let Some(qid) = binding_value(b, "country").strip_prefix(ENTITY_PREFIX) {
            self.countries.insert(qid.to_string());
        }
        if self.countries.contains("Q884") {
            return;
        }

        let label = |var: &str| binding_value(b, var).to_string();
        let (ja, zh, ru, en, nn) = (
            label("jaLabel"),
            label("zhLabel"),
            label("ruLabel"),
            label("enLabel"),
            label("nativeName"),
        );
        let mut add_native = |s: &str, ok: bool| {
            if !s.is_empty() && ok {
                self.native.insert(s.to_string());
            }
        };

        if self.countries.contains("Q17") {
            add_native(&ja, true);
            add_native(&nn, CJK.is_match(&nn));
        } else if self.countries.contains("Q148") {
            add_native(&zh, true);
            add_native(&nn, CJK.is_match(&nn));
        } else if self.countries.contains("Q159") {
            add_native(&ru, true);
            add_native(&nn, CYRILLIC.is_match(&nn));
        } else if !nn.is_empty() {
            if CJK.is_match(&nn) || CYRILLIC.is_match(&nn) {
                add_native(&nn, true);
            } else if LATIN.is_match(&nn) {
                self.roman.insert(nn.clone());
            }
        }
        if !en.is_empty() {
            self.roman.insert(en);
        }
    }

    pub fn from_bindings<'a>(rows: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut bundle = Self::default();
        for row in rows {
            bundle.absorb(row);
        }
        bundle
    }

    /// Best non-Hangul name of the bundle
    pub fn original_name(&self) -> Option<String> {
        pick_non_hangul_label(self.native.iter().chain(self.roman.iter()).map(String::as_str))
    }
}

fn ko_literal(name: &str) -> String {
    format!("\"{}\"@ko", sparql_literal(name))
}

pub fn exact_label_query(name: &str) -> String {
    format!(
        "{PREFIXES}SELECT DISTINCT ?author {BUNDLE_VARS} WHERE {{
  ?author wdt:P31 wd:Q5 .
  ?author (rdfs:label|skos:altLabel) ?lab .
  FILTER(lang(?lab) IN (\"ko\",\"en\")){BUNDLE_OPTIONALS}
  FILTER(?lab = {})
}}
LIMIT 30",
        ko_literal(name)
    )
}

pub fn contains_label_query(name: &str) -> String {
    format!(
        "{PREFIXES}SELECT DISTINCT ?author {BUNDLE_VARS} WHERE {{
  ?author wdt:P31 wd:Q5 .
  ?author (rdfs:label|skos:altLabel) ?lab .
  FILTER(lang(?lab) IN (\"ko\",\"en\")){BUNDLE_OPTIONALS}
  FILTER(CONTAINS(LCASE(?lab), \"{}\"))
}}
LIMIT 30",
        sparql_literal(&name.to_lowercase())
    )
}

pub fn batch_query(names: &[String]) -> String {
    let values = names.iter().map(|n| ko_literal(n)).collect::<Vec<_>>().join(" ");
    format!(
        "{PREFIXES}SELECT DISTINCT ?name {BUNDLE_VARS} WHERE {{
  VALUES ?name {{ {values} }}
  ?author wdt:P31 wd:Q5 .
  ?author (rdfs:label|skos:altLabel) ?lab .
  FILTER(?lab = ?name && lang(?lab) = \"ko\"){BUNDLE_OPTIONALS}
}} LIMIT 1000"
    )
}

/// How the REST route resolved a name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestResolution {
    pub value: Option<String>,
    pub qid: Option<String>,
    pub lang: Option<String>,
    /// `Wikidata(REST)` or `Wikidata(REST:ko-wiki)`
    pub source: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedOriginal {
    orig: Option<String>,
}

#[derive(Clone)]
pub struct WikidataService {
    http: HttpClient,
    cache: NameCacheRepository,
    config: WikidataConfig,
}

impl WikidataService {
    pub fn new(http: HttpClient, cache: NameCacheRepository, config: WikidataConfig) -> Self {
        Self { http, cache, config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    // =========================================================================
    // REST
    // =========================================================================

    /// First entity id of a Korean-language search
    pub async fn search_qid(&self, name: &str) -> AppResult<Option<String>> {
        let data: Value = self
            .http
            .get_json(
                &self.config.api_url,
                &[
                    ("action", "wbsearchentities"),
                    ("search", name),
                    ("language", "ko"),
                    ("uselang", "ko"),
                    ("type", "item"),
                    ("limit", "10"),
                    ("format", "json"),
                ],
            )
            .await?;
        Ok(data
            .pointer("/search/0/id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Entity id linked from the ko.wikipedia page of that title
    pub async fn kowiki_qid(&self, title: &str) -> AppResult<Option<String>> {
        let data: Value = self
            .http
            .get_json(
                &self.config.kowiki_api_url,
                &[
                    ("action", "query"),
                    ("titles", title),
                    ("prop", "pageprops"),
                    ("ppprop", "wikibase_item"),
                    ("format", "json"),
                ],
            )
            .await?;
        Ok(data
            .pointer("/query/pages")
            .and_then(Value::as_object)
            .and_then(|pages| {
                pages
                    .values()
                    .find_map(|p| p.pointer("/pageprops/wikibase_item").and_then(Value::as_str))
            })
            .map(str::to_string))
    }

    /// P27 citizenship ids, cached per entity
    pub async fn citizenship(&self, qid: &str) -> AppResult<Vec<String>> {
        let key = format!("wd-p27:{}", qid);
        if let Some(cached) = self.cache.get::<Vec<String>>(&key).await? {
            return Ok(cached);
        }
        let data: Value = self
            .http
            .get_json(
                &self.config.api_url,
                &[("action", "wbgetentities"), ("ids", qid), ("props", "claims"), ("format", "json")],
            )
            .await?;
        let countries: Vec<String> = data
            .pointer(&format!("/entities/{}/claims/P27", qid))
            .and_then(Value::as_array)
            .map(|claims| {
                claims
                    .iter()
                    .filter_map(|c| c.pointer("/mainsnak/datavalue/value/id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        self.cache.set(&key, &countries, None).await?;
        Ok(countries)
    }

    /// Labels of an entity in the given languages
    pub async fn labels(&self, qid: &str, langs: &[&str]) -> AppResult<BTreeMap<String, String>> {
        let languages = langs.join("|");
        let data: Value = self
            .http
            .get_json(
                &self.config.api_url,
                &[
                    ("action", "wbgetentities"),
                    ("ids", qid),
                    ("props", "labels|aliases"),
                    ("languages", &languages),
                    ("format", "json"),
                ],
            )
            .await?;
        Ok(data
            .pointer(&format!("/entities/{}/labels", qid))
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(lang, v)| {
                        v.get("value")
                            .and_then(Value::as_str)
                            .map(|s| (lang.clone(), s.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Label in the person's own language, found through the REST API
    pub async fn original_name_rest(&self, name_ko: &str) -> AppResult<RestResolution> {
        let (qid, source) = match self.search_qid(name_ko).await? {
            Some(qid) => (qid, "Wikidata(REST)"),
            None => match self.kowiki_qid(name_ko).await? {
                Some(qid) => (qid, "Wikidata(REST:ko-wiki)"),
                None => {
                    return Ok(RestResolution {
                        source: "Wikidata(REST)".to_string(),
                        reason: Some("no qid".to_string()),
                        ..Default::default()
                    })
                }
            },
        };

        let countries = self.citizenship(&qid).await?;
        let langs = preferred_languages(&countries);
        let labels = self.labels(&qid, &langs).await?;

        let picked = langs
            .iter()
            .find_map(|lang| labels.get(*lang).map(|v| (lang.to_string(), v.clone())))
            .map(|(lang, value)| {
                let value = if lang == "en" && value.trim().contains(' ') {
                    simple_reorder_family_given(&value)
                } else {
                    value
                };
                (lang, value)
            })
            .or_else(|| labels.iter().next().map(|(l, v)| (l.clone(), v.clone())));

        Ok(match picked {
            Some((lang, value)) => RestResolution {
                value: Some(value),
                qid: Some(qid),
                lang: Some(lang),
                source: source.to_string(),
                reason: None,
            },
            None => RestResolution {
                qid: Some(qid),
                source: source.to_string(),
                reason: Some("no labels".to_string()),
                ..Default::default()
            },
        })
    }

    // =========================================================================
    // SPARQL
    // =========================================================================

    pub async fn sparql(&self, query: &str) -> AppResult<Value> {
        tracing::debug!("Wikidata SPARQL query");
        let resp = self
            .http
            .send(|c| {
                c.get(&self.config.sparql_url)
                    .header(ACCEPT, "application/sparql-results+json")
                    .query(&[("query", query), ("format", "json")])
            })
            .await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Name bundle of a Korean label, exact match first, cached
    pub async fn name_bundle(&self, name: &str) -> AppResult<NameBundle> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(NameBundle::default());
        }
        let key = format!("wikidata|{}", name);
        if let Some(bundle) = self.cache.get::<NameBundle>(&key).await? {
            return Ok(bundle);
        }

        let mut data = self.sparql(&exact_label_query(name)).await?;
        if bindings(&data).is_empty() {
            data = self.sparql(&contains_label_query(name)).await?;
        }
        let bundle = NameBundle::from_bindings(bindings(&data));
        self.cache.set(&key, &bundle, None).await?;
        Ok(bundle)
    }

    /// Fill the bundle cache for every uncached name with one query
    pub async fn prewarm(&self, names: &[String]) -> AppResult<usize> {
        if !self.config.enabled {
            return Ok(0);
        }
        let mut to_query: IndexSet<String> = IndexSet::new();
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if self.cache.get::<NameBundle>(&format!("wikidata|{}", name)).await?.is_none() {
                to_query.insert(name.to_string());
            }
        }
        if to_query.is_empty() {
            return Ok(0);
        }
        let to_query: Vec<String> = to_query.into_iter().collect();

        let data = self.sparql(&batch_query(&to_query)).await?;
        let rows = bindings(&data);
        let entries: Vec<(String, NameBundle)> = to_query
            .iter()
            .map(|name| {
                let bundle = NameBundle::from_bindings(rows.iter().filter(|b| binding_value(b, "name") == name));
                (format!("wikidata|{}", name), bundle)
            })
            .collect();
        self.cache.set_many(&entries, None).await?;
        tracing::debug!(count = entries.len(), "Prewarmed Wikidata name bundles");
        Ok(entries.len())
    }

    /// Original name through the bundle route, trying spelling variants
    pub async fn legacy_original_name(&self, name_ko: &str) -> AppResult<Option<String>> {
        let name_ko = name_ko.trim();
        if name_ko.is_empty() {
            return Ok(None);
        }
        let key = format!("wd-orig:{}", name_ko);
        if let Some(cached) = self.cache.get::<CachedOriginal>(&key).await? {
            return Ok(cached.orig);
        }

        let mut orig = None;
        for variant in ko_name_variants(name_ko) {
            let bundle = self.name_bundle(&variant).await?;
            if !bundle.is_empty() {
                orig = bundle.original_name();
                break;
            }
        }
        self.cache.set(&key, &CachedOriginal { orig: orig.clone() }, None).await?;
        Ok(orig)
    }
}
