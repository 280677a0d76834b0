//! Configuration management for the KORMARC server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token required by registry write endpoints. Open when unset.
    #[serde(default)]
    pub admin_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Shared outbound HTTP settings
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub retries: u32,
    pub backoff_factor: f64,
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AladinConfig {
    pub ttb_key: Option<String>,
    pub api_url: String,
    pub web_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NlkConfig {
    pub cert_key: Option<String>,
    pub seoji_endpoints: Vec<String>,
    pub lod_endpoints: Vec<String>,
    pub lod_retries: u32,
    pub lod_backoff: f64,
    pub seoji_cache_ttl_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WikidataConfig {
    pub enabled: bool,
    pub api_url: String,
    pub sparql_url: String,
    pub kowiki_api_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Model used for language guesses and subject keywords
    pub analysis_model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    pub kpipa_url: String,
    pub mcst_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogingConfig {
    pub include_illustrators_as_authors: bool,
    pub use_lod: bool,
    pub include_translators_in_900: bool,
    pub ai_940: bool,
    pub kdc_edition: String,
    pub max_batch: usize,
    pub batch_concurrency: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub aladin: AladinConfig,
    #[serde(default)]
    pub nlk: NlkConfig,
    #[serde(default)]
    pub wikidata: WikidataConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub cataloging: CatalogingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (KORMARC__NLK__CERT_KEY, ...)
            .add_source(
                Environment::with_prefix("KORMARC")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("aladin.ttb_key", env::var("ALADIN_TTB_KEY").ok())?
            .set_override_option("nlk.cert_key", env::var("NLK_CERT_KEY").ok())?
            .set_override_option("openai.api_key", env::var("OPENAI_API_KEY").ok())?
            .set_override_option("openai.model", env::var("OPENAI_MODEL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            admin_token: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://kormarc.sqlite3?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            connect_timeout_secs: 5,
            retries: 4,
            backoff_factor: 0.7,
            user_agent: concat!("kormarc-server/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for AladinConfig {
    fn default() -> Self {
        Self {
            ttb_key: None,
            api_url: "http://www.aladin.co.kr/ttb/api/ItemLookUp.aspx".to_string(),
            web_url: "https://www.aladin.co.kr".to_string(),
        }
    }
}

impl Default for NlkConfig {
    fn default() -> Self {
        Self {
            cert_key: None,
            seoji_endpoints: vec![
                "https://seoji.nl.go.kr/landingPage/SearchApi.do".to_string(),
                "https://www.nl.go.kr/seoji/SearchApi.do".to_string(),
                "http://seoji.nl.go.kr/landingPage/SearchApi.do".to_string(),
                "http://www.nl.go.kr/seoji/SearchApi.do".to_string(),
            ],
            lod_endpoints: vec![
                "https://lod.nl.go.kr/sparql".to_string(),
                "http://lod.nl.go.kr/sparql".to_string(),
            ],
            lod_retries: 2,
            lod_backoff: 1.6,
            seoji_cache_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://www.wikidata.org/w/api.php".to_string(),
            sparql_url: "https://query.wikidata.org/sparql".to_string(),
            kowiki_api_url: "https://ko.wikipedia.org/w/api.php".to_string(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            analysis_model: "gpt-4o".to_string(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kpipa_url: "https://bnk.kpipa.or.kr".to_string(),
            mcst_url: "https://book.mcst.go.kr".to_string(),
        }
    }
}

impl Default for CatalogingConfig {
    fn default() -> Self {
        Self {
            include_illustrators_as_authors: true,
            use_lod: true,
            include_translators_in_900: true,
            ai_940: true,
            kdc_edition: "6".to_string(),
            max_batch: 100,
            batch_concurrency: 4,
        }
    }
}
