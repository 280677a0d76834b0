//! Language model client and the cataloging prompts built on it

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::{
    config::OpenAiConfig,
    error::{AppError, AppResult},
    models::aladin::AladinItem,
    repository::cache::NameCacheRepository,
    services::http::HttpClient,
    text::{
        keywords::{finalize_keywords, keyword_prompt, parse_keyword_line, KeywordSource, KEYWORD_SYSTEM_PROMPT},
        names::{fallback_order, is_mononym, name_order_cache_key, NameOrderDecision, NAME_ORDER_SYSTEM_PROMPT},
        reading::{ai_reading_cache_key, ai_reading_prompt, filter_ai_readings, AI_READING_SYSTEM_PROMPT, MAX_AI_READINGS},
        script::{is_allowed_code, UNDETERMINED},
    },
};

static KDC_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([0-9]{1,3}(?:\.[0-9]+)?)\b").expect("valid regex"));

const READING_MODEL: &str = "gpt-4o-mini";
const LANGUAGE_CODES: &str = "kor, eng, jpn, chi, rus, fre, ger, ita, spa, por, tur";

const KDC_SYSTEM_PROMPT: &str = "너는 한국 십진분류(KDC) 전문가다. \
아래 도서 정보를 보고 KDC 분류기호를 '숫자만' 출력해라. \
형식 예시: 813.7 / 325.1 / 005 / 181 등. \
설명, 접두/접미 텍스트, 기타 문자는 절대 출력하지 마라.";

/// One chat completion call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// `(name, schema)` for structured JSON output
    pub json_schema: Option<(String, Value)>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Text of the first choice
    async fn complete(&self, request: ChatRequest) -> AppResult<String>;
}

/// OpenAI-compatible `/chat/completions` client
pub struct OpenAiClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(http: HttpClient, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Client from config, None without an API key
    pub fn from_config(http: HttpClient, config: &OpenAiConfig) -> Option<Self> {
        config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|key| Self::new(http, key, config.base_url.trim_end_matches('/')))
    }

    fn body(request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some((name, schema)) = &request.json_schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {"name": name, "schema": schema, "strict": true},
            });
        }
        body
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::body(&request);
        tracing::debug!(model = %request.model, "Chat completion");

        let resp = self
            .http
            .send(|c| c.post(&url).bearer_auth(&self.api_key).json(&body))
            .await?;
        let data: Value = serde_json::from_str(&resp.text().await?)?;
        data.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| AppError::Upstream("Chat completion without content".to_string()))
    }
}

/// Language code with the model's stated grounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageGuess {
    pub code: String,
    pub reason: String,
    pub signals: String,
}

impl LanguageGuess {
    pub fn undetermined(reason: impl Into<String>) -> Self {
        Self {
            code: UNDETERMINED.to_string(),
            reason: reason.into(),
            signals: String::new(),
        }
    }

    pub fn is_determined(&self) -> bool {
        self.code != UNDETERMINED
    }
}

/// Parse `$h=code` / `#reason=` / `#signals=` lines; unknown codes become `und`
pub fn parse_language_reply(content: &str, code_key: &str) -> LanguageGuess {
    let prefix = format!("{}=", code_key);
    let mut guess = LanguageGuess::undetermined("");
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();
        if let Some(code) = line.strip_prefix(&prefix) {
            guess.code = code.trim().to_lowercase();
        } else if lower.starts_with("#reason=") {
            guess.reason = line["#reason=".len()..].trim().to_string();
        } else if lower.starts_with("#signals=") {
            guess.signals = line["#signals=".len()..].trim().to_string();
        }
    }
    if !is_allowed_code(&guess.code) {
        guess.code = UNDETERMINED.to_string();
    }
    guess
}

/// First KDC number in a reply
pub fn parse_kdc(content: &str) -> Option<String> {
    KDC_CODE.captures(content).map(|c| c[1].to_string())
}

/// Facts the language prompts work from
#[derive(Debug, Clone, Default)]
pub struct LanguageFacts<'a> {
    pub title: &'a str,
    pub original_title: &'a str,
    pub category: &'a str,
    pub publisher: &'a str,
    pub author: &'a str,
}

fn original_language_prompt(f: &LanguageFacts<'_>) -> String {
    format!(
        "아래 도서의 원서 언어(041 $h)를 ISDS 코드로 추정해줘.\n\
         가능한 코드: {codes}\n\n\
         도서정보:\n\
         - 제목: {title}\n\
         - 원제: {orig}\n\
         - 분류: {cat}\n\
         - 출판사: {publisher}\n\
         - 저자: {author}\n\n\
         지침:\n\
         - 국가/지역을 언어로 곧바로 치환하지 말 것.\n\
         - 저자 국적·주 집필 언어·최초 출간 언어를 우선 고려.\n\
         - 불확실하면 임의 추정 대신 'und' 사용.\n\n\
         출력형식(정확히 이 2~3줄):\n\
         $h=[ISDS 코드]\n\
         #reason=[짧게 근거 요약]\n\
         #signals=[잡은 단서들, 콤마로](선택)",
        codes = LANGUAGE_CODES,
        title = f.title,
        orig = if f.original_title.is_empty() { "(없음)" } else { f.original_title },
        cat = f.category,
        publisher = f.publisher,
        author = f.author,
    )
}

fn main_language_prompt(f: &LanguageFacts<'_>) -> String {
    format!(
        "아래 도서의 본문 언어(041 $a)를 ISDS 코드로 추정.\n\
         가능한 코드: {codes}\n\n\
         입력:\n\
         - 제목: {title}\n\
         - 분류: {cat}\n\
         - 출판사: {publisher}\n\n\
         지침:\n\
         - '본문 언어'는 이 자료의 현시본(Manifestation) 언어다.\n\
         - 저자 국적, 원작 언어, 시리즈 원산지 등 원작 관련 단서 사용 금지.\n\
         - 카테고리에 '국내도서'가 있거나, 제목에 한글이 1자라도 포함되면 반드시 kor.\n\
         - 허용 코드 밖이거나 불확실하면 'und'.\n\n\
         출력형식:\n\
         $a=[ISDS 코드]\n\
         #reason=[짧게 근거 요약]\n\
         #signals=[잡은 단서들, 콤마로](선택)",
        codes = LANGUAGE_CODES,
        title = f.title,
        cat = f.category,
        publisher = f.publisher,
    )
}

fn author_language_prompt(f: &LanguageFacts<'_>) -> String {
    format!(
        "저자 정보를 중심으로 원서 언어(041 $h)를 ISDS 코드로 추정.\n\
         가능한 코드: {codes}\n\n\
         입력:\n\
         - 저자: {author}\n\
         - (참고) 제목: {title}\n\
         - (참고) 분류: {cat}\n\
         - (참고) 출판사: {publisher}\n\n\
         지침:\n\
         - 저자 국적·주 집필 언어·대표 작품 원어를 우선.\n\
         - 국가=언어 단순 치환 금지.\n\
         - 불확실하면 'und'.\n\n\
         출력형식:\n\
         $h=[ISDS 코드]\n\
         #reason=[짧게 근거 요약]\n\
         #signals=[잡은 단서들, 콤마로](선택)",
        codes = LANGUAGE_CODES,
        author = f.author,
        title = f.title,
        cat = f.category,
        publisher = f.publisher,
    )
}

fn name_order_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "action": {"type": "string", "enum": ["KEEP", "REORDER"]},
            "result": {"type": "string"},
            "reason": {"type": "string"},
            "confidence": {"type": "number"}
        },
        "required": ["action", "result", "reason", "confidence"],
        "additionalProperties": false
    })
}

/// Cataloging prompts over an optional model; every call degrades instead of failing
#[derive(Clone)]
pub struct Assistant {
    model: Option<Arc<dyn LanguageModel>>,
    cache: NameCacheRepository,
    config: OpenAiConfig,
}

impl Assistant {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, cache: NameCacheRepository, config: OpenAiConfig) -> Self {
        Self { model, cache, config }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    async fn ask(&self, request: ChatRequest) -> AppResult<String> {
        match &self.model {
            Some(model) => model.complete(request).await,
            None => Err(AppError::Upstream("No language model configured".to_string())),
        }
    }

    fn analysis(&self, system: &str, user: String, temperature: f32, max_tokens: Option<u32>) -> ChatRequest {
        ChatRequest {
            model: self.config.analysis_model.clone(),
            system: system.to_string(),
            user,
            temperature,
            max_tokens,
            json_schema: None,
        }
    }

    // =========================================================================
    // NAME ORDER (700)
    // =========================================================================

    pub async fn name_order(&self, name: &str, context: &str) -> NameOrderDecision {
        let name = name.trim();
        if is_mononym(name) {
            return NameOrderDecision::keep(name, "mononym", 0.9);
        }
        if self.model.is_none() {
            return fallback_order(name, "no model");
        }

        let key = name_order_cache_key(name, context);
        match self.cache.get::<NameOrderDecision>(&key).await {
            Ok(Some(decision)) => return decision,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Name-order cache read failed"),
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            system: NAME_ORDER_SYSTEM_PROMPT.to_string(),
            user: format!("저자명(한글 표기): {}\n컨텍스트: {}", name, context),
            temperature: 0.0,
            max_tokens: None,
            json_schema: Some(("name_order".to_string(), name_order_schema())),
        };
        let decision = match self.ask(request).await {
            Ok(content) => match serde_json::from_str::<NameOrderDecision>(&content) {
                Ok(d) => d.corrected(name),
                Err(e) => {
                    tracing::warn!(name, error = %e, "Unparseable name-order answer");
                    return fallback_order(name, "unparseable answer");
                }
            },
            Err(e) => {
                tracing::warn!(name, error = %e, "Name-order call failed");
                return fallback_order(name, "model error");
            }
        };
        if let Err(e) = self.cache.set(&key, &decision, None).await {
            tracing::warn!(error = %e, "Name-order cache write failed");
        }
        decision
    }

    // =========================================================================
    // 940 READINGS
    // =========================================================================

    /// Strict Hangul readings of a title, cached per title
    pub async fn readings_940(&self, title_a: &str) -> Vec<String> {
        if self.model.is_none() {
            return Vec::new();
        }
        let key = ai_reading_cache_key(title_a);
        if let Ok(Some(cached)) = self.cache.get::<Vec<String>>(&key).await {
            return cached;
        }
        let request = ChatRequest {
            model: READING_MODEL.to_string(),
            system: AI_READING_SYSTEM_PROMPT.to_string(),
            user: ai_reading_prompt(title_a),
            temperature: 0.2,
            max_tokens: None,
            json_schema: None,
        };
        match self.ask(request).await {
            Ok(content) => {
                let readings: Vec<String> = filter_ai_readings(title_a, &content)
                    .into_iter()
                    .take(MAX_AI_READINGS)
                    .collect();
                if let Err(e) = self.cache.set(&key, &readings, None).await {
                    tracing::warn!(error = %e, "940 cache write failed");
                }
                readings
            }
            Err(e) => {
                tracing::warn!(error = %e, "940 reading call failed");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // LANGUAGE (041)
    // =========================================================================

    async fn guess(&self, system: &str, prompt: String, code_key: &str) -> LanguageGuess {
        if self.model.is_none() {
            return LanguageGuess::undetermined("no model");
        }
        match self.ask(self.analysis(system, prompt, 0.0, None)).await {
            Ok(content) => {
                let guess = parse_language_reply(&content, code_key);
                tracing::debug!(system, code = %guess.code, reason = %guess.reason, signals = %guess.signals, "Language guess");
                guess
            }
            Err(e) => {
                tracing::warn!(system, error = %e, "Language guess failed");
                LanguageGuess::undetermined(e.to_string())
            }
        }
    }

    pub async fn guess_original_language(&self, facts: &LanguageFacts<'_>) -> LanguageGuess {
        self.guess("사서용 언어 추정기", original_language_prompt(facts), "$h").await
    }

    pub async fn guess_main_language(&self, facts: &LanguageFacts<'_>) -> LanguageGuess {
        self.guess("사서용 본문 언어 추정기", main_language_prompt(facts), "$a").await
    }

    pub async fn guess_language_by_author(&self, facts: &LanguageFacts<'_>) -> LanguageGuess {
        if facts.author.trim().is_empty() {
            return LanguageGuess::undetermined("no author");
        }
        self.guess("저자 기반 원서 언어 추정기", author_language_prompt(facts), "$h").await
    }

    // =========================================================================
    // KDC (056)
    // =========================================================================

    pub async fn kdc(&self, item: &AladinItem) -> Option<String> {
        self.model.as_ref()?;
        let payload = json!({
            "title": item.title,
            "author": item.author,
            "publisher": item.publisher,
            "pub_date": item.pub_date,
            "isbn13": item.isbn13,
            "category": item.category_name,
            "description": item.description_text(),
            "toc": item.sub_info.toc,
        });
        let user = format!(
            "도서 정보(JSON):\n{}\n\nKDC 숫자만 출력:",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        );
        let request = ChatRequest {
            model: self.config.model.clone(),
            system: KDC_SYSTEM_PROMPT.to_string(),
            user,
            temperature: 0.0,
            max_tokens: Some(8),
            json_schema: None,
        };
        match self.ask(request).await {
            Ok(content) => parse_kdc(&content),
            Err(e) => {
                tracing::warn!(error = %e, "KDC call failed");
                None
            }
        }
    }

    // =========================================================================
    // KEYWORDS (653)
    // =========================================================================

    pub async fn keywords(&self, src: &KeywordSource<'_>, forbidden: &BTreeSet<String>) -> Vec<String> {
        if self.model.is_none() {
            return Vec::new();
        }
        let request = self.analysis(KEYWORD_SYSTEM_PROMPT, keyword_prompt(src, forbidden), 0.2, Some(180));
        match self.ask(request).await {
            Ok(content) => finalize_keywords(parse_keyword_line(&content), forbidden),
            Err(e) => {
                tracing::warn!(error = %e, "653 keyword call failed");
                Vec::new()
            }
        }
    }
}
