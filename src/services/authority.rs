//! Original-script names (900) and name headings (700)

use indexmap::IndexSet;

use crate::{
    config::CatalogingConfig,
    marc::{
        builders::{build_700, build_900},
        DataField,
    },
    models::record::NameTrace,
    services::{
        llm::Assistant,
        nlk::NlkService,
        wikidata::{is_korean_national, WikidataService},
    },
    text::{
        names::is_east_asian_country,
        people::{People, Role},
        script::looks_korean_person_name,
    },
};

/// Everything learned about one contributor
#[derive(Debug, Clone)]
pub struct PersonAuthority {
    pub name: String,
    pub role: Role,
    pub original: Option<String>,
    pub qid: Option<String>,
    pub countries: Vec<String>,
    pub traces: Vec<NameTrace>,
}

impl PersonAuthority {
    fn new(name: &str, role: Role) -> Self {
        Self {
            name: name.trim().to_string(),
            role,
            original: None,
            qid: None,
            countries: Vec::new(),
            traces: Vec::new(),
        }
    }

    fn trace(&self, route: &str, source: &str) -> NameTrace {
        NameTrace {
            who: self.name.clone(),
            role: Some(self.role),
            route: route.to_string(),
            key: self.name.clone(),
            source: source.to_string(),
            ..Default::default()
        }
    }

    /// Korean nationals, and unidentified people with Korean-looking names
    pub fn is_korean(&self) -> bool {
        is_korean_national(&self.countries) || (self.qid.is_none() && looks_korean_person_name(&self.name))
    }

    pub fn is_east_asian(&self) -> bool {
        self.countries.iter().any(|c| is_east_asian_country(c))
    }
}

/// 900 fields from resolved contributors, with the traces that explain them
pub fn fields_900(persons: &[PersonAuthority], include_translators: bool) -> (Vec<DataField>, Vec<NameTrace>) {
    let mut seen: IndexSet<(String, Role)> = IndexSet::new();
    let mut traces = Vec::new();
    for person in persons {
        let mut person_traces = person.traces.clone();
        let wanted = person.role == Role::Author || (include_translators && person.role == Role::Translator);
        if wanted {
            match &person.original {
                Some(value) if person.is_korean() => {
                    if let Some(last) = person_traces.last_mut() {
                        last.filtered = true;
                        last.reason = Some("korean national".to_string());
                    }
                    tracing::debug!(who = %person.name, value = %value, "Skipping 900 for Korean national");
                }
                Some(value) => {
                    seen.insert((value.clone(), person.role));
                }
                None => {}
            }
        }
        traces.append(&mut person_traces);
    }
    let fields = seen.iter().map(|(value, _)| build_900(value)).collect();
    (fields, traces)
}

#[derive(Clone)]
pub struct AuthorityService {
    nlk: NlkService,
    wikidata: WikidataService,
    assistant: Assistant,
    config: CatalogingConfig,
}

impl AuthorityService {
    pub fn new(nlk: NlkService, wikidata: WikidataService, assistant: Assistant, config: CatalogingConfig) -> Self {
        Self {
            nlk,
            wikidata,
            assistant,
            config,
        }
    }

    /// Try NLK LOD, the Wikidata label bundles, then the Wikidata REST API
    pub async fn resolve_original_name(&self, name_ko: &str, role: Role) -> PersonAuthority {
        let mut person = PersonAuthority::new(name_ko, role);
        if person.name.is_empty() {
            return person;
        }

        if self.config.use_lod {
            let mut trace = person.trace("LOD", "NLK LOD");
            match self.nlk.original_name(&person.name).await {
                Ok((value, prov)) => {
                    trace.reason = match (&value, &prov.person_uri) {
                        (Some(_), _) => None,
                        (None, Some(_)) => Some("no non-Hangul name".to_string()),
                        (None, None) => Some("no candidate".to_string()),
                    };
                    trace.value = value.clone();
                    person.traces.push(trace);
                    if value.is_some() {
                        person.original = value;
                        return person;
                    }
                }
                Err(e) => {
                    trace.error = Some(e.to_string());
                    person.traces.push(trace);
                }
            }
        }

        if !self.wikidata.enabled() {
            return person;
        }

        let mut trace = person.trace("Wikidata", "Wikidata(SPARQL)");
        match self.wikidata.legacy_original_name(&person.name).await {
            Ok(value) => {
                if let Ok(bundle) = self.wikidata.name_bundle(&person.name).await {
                    person.countries = bundle.countries.into_iter().collect();
                    trace.countries = person.countries.clone();
                }
                trace.reason = value.is_none().then(|| "no bundle".to_string());
                trace.value = value.clone();
                person.traces.push(trace);
                if value.is_some() {
                    person.original = value;
                    return person;
                }
            }
            Err(e) => {
                trace.error = Some(e.to_string());
                person.traces.push(trace);
            }
        }

        let mut trace = person.trace("Wikidata(REST)", "Wikidata(REST)");
        match self.wikidata.original_name_rest(&person.name).await {
            Ok(res) => {
                if let Some(qid) = &res.qid {
                    match self.wikidata.citizenship(qid).await {
                        Ok(countries) => person.countries = countries,
                        Err(e) => tracing::debug!(qid = %qid, error = %e, "P27 lookup failed"),
                    }
                }
                trace.source = res.source;
                trace.qid = res.qid.clone();
                trace.lang = res.lang;
                trace.reason = res.reason;
                trace.value = res.value.clone();
                trace.countries = person.countries.clone();
                person.qid = res.qid;
                person.original = res.value;
            }
            Err(e) => trace.error = Some(e.to_string()),
        }
        person.traces.push(trace);
        person
    }

    /// Authors then translators, each resolved once
    pub async fn resolve_people(&self, people: &People) -> Vec<PersonAuthority> {
        let mut persons = Vec::new();
        for (name, role) in people.responsible() {
            persons.push(self.resolve_original_name(name, role).await);
        }
        persons
    }

    pub fn build_900(&self, persons: &[PersonAuthority]) -> (Vec<DataField>, Vec<NameTrace>) {
        fields_900(persons, self.config.include_translators_in_900)
    }

    /// 700 headings; East-Asian names keep their order
    pub async fn build_700(&self, persons: &[PersonAuthority], context: &str) -> Vec<DataField> {
        let mut names: IndexSet<String> = IndexSet::new();
        for person in persons.iter().filter(|p| !p.name.is_empty()) {
            let heading = if person.is_east_asian() {
                person.name.clone()
            } else {
                self.assistant.name_order(&person.name, context).await.result
            };
            names.insert(heading);
        }
        names.iter().map(|n| build_700(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpConfig, NlkConfig, OpenAiConfig, WikidataConfig};
    use crate::repository::{cache::NameCacheRepository, test_pool};
    use crate::services::http::HttpClient;

    fn person(name: &str, role: Role, original: Option<&str>, qid: Option<&str>, countries: &[&str]) -> PersonAuthority {
        let mut p = PersonAuthority::new(name, role);
        p.original = original.map(str::to_string);
        p.qid = qid.map(str::to_string);
        p.countries = countries.iter().map(|c| c.to_string()).collect();
        p.traces.push(p.trace("Wikidata(REST)", "Wikidata(REST)"));
        p
    }

    async fn service(url: &str) -> AuthorityService {
        let pool = test_pool().await;
        let http = HttpClient::new(&HttpConfig {
            retries: 0,
            ..HttpConfig::default()
        })
        .unwrap();
        let cache = NameCacheRepository::new(pool);
        let nlk = NlkService::new(http.clone(), cache.clone(), NlkConfig::default());
        let wikidata = WikidataService::new(
            http,
            cache.clone(),
            WikidataConfig {
                enabled: true,
                api_url: format!("{}/w/api.php", url),
                sparql_url: format!("{}/sparql", url),
                kowiki_api_url: format!("{}/ko/api.php", url),
            },
        );
        let assistant = Assistant::new(None, cache, OpenAiConfig::default());
        AuthorityService::new(
            nlk,
            wikidata,
            assistant,
            CatalogingConfig {
                use_lod: false,
                ..CatalogingConfig::default()
            },
        )
    }

    #[test]
    fn test_900_filters_and_dedups() {
        let persons = vec![
            person("레프 톨스토이", Role::Author, Some("Толстой, Лев"), Some("Q7243"), &["Q159"]),
            person("한강", Role::Author, Some("Han Kang"), Some("Q20"), &["Q884"]),
            person("김철수", Role::Translator, Some("Kim Cheol-su"), None, &[]),
            person("톨스토이", Role::Author, Some("Толстой, Лев"), None, &[]),
            person("존 스미스", Role::Translator, Some("Smith, John"), Some("Q1"), &["Q30"]),
            person("아무개", Role::Author, None, None, &[]),
        ];
        let (fields, traces) = fields_900(&persons, true);
        let values: Vec<&str> = fields.iter().filter_map(|f| f.get_subfield('a')).collect();
        assert_eq!(values, vec!["Толстой, Лев", "Smith, John"]);
        assert_eq!(traces.len(), 6);
        assert!(traces[1].filtered);
        assert!(traces[2].filtered);
        assert!(!traces[0].filtered);

        let (fields, _) = fields_900(&persons, false);
        assert_eq!(fields.len(), 1);
    }

    #[tokio::test]
    async fn test_700_keeps_east_asian_order() {
        let svc = service("http://127.0.0.1:9").await;
        let persons = vec![
            person("무라카미 하루키", Role::Author, None, Some("Q134"), &["Q17"]),
            person("레프 톨스토이", Role::Author, None, None, &["Q159"]),
            person("김난주", Role::Translator, None, None, &[]),
        ];
        let fields = svc.build_700(&persons, "").await;
        let names: Vec<&str> = fields.iter().filter_map(|f| f.get_subfield('a')).collect();
        assert_eq!(names, vec!["무라카미 하루키", "톨스토이, 레프", "김난주"]);
    }

    #[tokio::test]
    async fn test_resolution_falls_through_to_rest() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/sparql")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"results":{"bindings":[]}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/w/api.php")
            .match_query(mockito::Matcher::UrlEncoded("action".into(), "wbsearchentities".into()))
            .with_body(r#"{"search":[{"id":"Q39829"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/w/api.php")
            .match_query(mockito::Matcher::UrlEncoded("props".into(), "claims".into()))
            .with_body(r#"{"entities":{"Q39829":{"claims":{"P27":[{"mainsnak":{"datavalue":{"value":{"id":"Q17"}}}}]}}}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/w/api.php")
            .match_query(mockito::Matcher::UrlEncoded("props".into(), "labels|aliases".into()))
            .with_body(r#"{"entities":{"Q39829":{"labels":{"ja":{"value":"村上春樹"}}}}}"#)
            .create_async()
            .await;

        let svc = service(&server.url()).await;
        let person = svc.resolve_original_name("무라카미 하루키", Role::Author).await;
        assert_eq!(person.original.as_deref(), Some("村上春樹"));
        assert_eq!(person.qid.as_deref(), Some("Q39829"));
        assert!(person.is_east_asian());
        assert_eq!(person.traces.len(), 2);
        assert_eq!(person.traces[0].route, "Wikidata");
        assert_eq!(person.traces[1].lang.as_deref(), Some("ja"));
    }
}
