//! Business logic services

pub mod aladin;
pub mod authority;
pub mod http;
pub mod language;
pub mod llm;
pub mod location;
pub mod nlk;
pub mod records;
pub mod registry;
pub mod wikidata;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub aladin: aladin::AladinService,
    pub nlk: nlk::NlkService,
    pub wikidata: wikidata::WikidataService,
    pub registry: registry::RegistryService,
    pub location: location::LocationService,
    pub assistant: llm::Assistant,
    pub authority: authority::AuthorityService,
    pub language: language::LanguageService,
    pub records: records::RecordService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let http = http::HttpClient::new(&config.http)?;
        let cache = repository.cache.clone();

        let model = llm::OpenAiClient::from_config(http.clone(), &config.openai)
            .map(|client| Arc::new(client) as Arc<dyn llm::LanguageModel>);
        let assistant = llm::Assistant::new(model, cache.clone(), config.openai.clone());
        if !assistant.is_available() {
            tracing::warn!("No OpenAI API key; 056, 653 and model-backed 041/700/940 steps are skipped");
        }

        let aladin = aladin::AladinService::new(http.clone(), config.aladin.clone());
        let nlk = nlk::NlkService::new(http.clone(), cache.clone(), config.nlk.clone());
        let wikidata = wikidata::WikidataService::new(http.clone(), cache, config.wikidata.clone());
        let registry = registry::RegistryService::new(http, config.registry.clone());
        let location = location::LocationService::new(registry.clone(), repository.publishers.clone());
        let authority = authority::AuthorityService::new(
            nlk.clone(),
            wikidata.clone(),
            assistant.clone(),
            config.cataloging.clone(),
        );
        let language = language::LanguageService::new(assistant.clone());
        let records = records::RecordService::new(
            aladin.clone(),
            nlk.clone(),
            wikidata.clone(),
            location.clone(),
            authority.clone(),
            language.clone(),
            assistant.clone(),
            config.cataloging.clone(),
        );

        Ok(Self {
            aladin,
            nlk,
            wikidata,
            registry,
            location,
            assistant,
            authority,
            language,
            records,
            repository,
        })
    }
}
