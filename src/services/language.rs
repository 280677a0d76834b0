//! Text and original language for 041 and 546

use crate::{
    marc::{
        builders::{build_041, build_546},
        DataField,
    },
    services::llm::{Assistant, LanguageFacts},
    text::{
        category::{is_domestic_category, is_literature_category, is_nonfiction_override, language_from_category},
        script::{detect_language, is_allowed_code, UNDETERMINED},
    },
};

const ROMANCE: &[&str] = &["ita", "fre", "spa", "por"];

/// What the language decision works from
#[derive(Debug, Clone, Default)]
pub struct LanguageInput<'a> {
    pub title: &'a str,
    pub original_title: &'a str,
    /// Category breadcrumb, product page first
    pub category: &'a str,
    pub publisher: &'a str,
    pub author: &'a str,
    /// Language from the product page info box
    pub page_language: Option<&'a str>,
}

impl<'a> LanguageInput<'a> {
    fn facts(&self) -> LanguageFacts<'a> {
        LanguageFacts {
            title: self.title,
            original_title: self.original_title,
            category: self.category,
            publisher: self.publisher,
            author: self.author,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LanguageDecision {
    pub text_language: String,
    pub original_language: Option<String>,
    pub field_041: DataField,
    pub field_546: DataField,
    pub debug: Vec<String>,
}

fn determined(code: &str) -> Option<&str> {
    Some(code).filter(|c| !c.is_empty() && *c != UNDETERMINED)
}

/// Settle the original language between the first candidate and the hints
pub fn reconcile(candidate: &str, rule_hint: Option<&str>, author_hint: Option<&str>) -> String {
    if let Some(author) = author_hint.and_then(determined) {
        if author != candidate {
            return author.to_string();
        }
    }
    if let Some(rule) = rule_hint.and_then(determined) {
        if rule != candidate && ROMANCE.contains(&candidate) {
            return rule.to_string();
        }
    }
    candidate.to_string()
}

#[derive(Clone)]
pub struct LanguageService {
    assistant: Assistant,
}

impl LanguageService {
    pub fn new(assistant: Assistant) -> Self {
        Self { assistant }
    }

    /// `$a`: script of the title, Korean for domestic books, model for und/eng
    pub async fn text_language(&self, input: &LanguageInput<'_>, debug: &mut Vec<String>) -> String {
        let mut lang = detect_language(input.title).to_string();
        debug.push(format!("041 $a by script: {}", lang));
        if is_domestic_category(input.category) {
            debug.push("domestic category, $a=kor".to_string());
            lang = "kor".to_string();
        }
        if lang == UNDETERMINED || lang == "eng" {
            let guess = self.assistant.guess_main_language(&input.facts()).await;
            debug.push(format!("041 $a by model: {} ({})", guess.code, guess.reason));
            lang = if is_allowed_code(&guess.code) {
                guess.code
            } else {
                UNDETERMINED.to_string()
            };
        }
        lang
    }

    /// `$h`: literature trusts the category first, non-fiction the model
    pub async fn original_language(&self, input: &LanguageInput<'_>, debug: &mut Vec<String>) -> String {
        let literature = is_literature_category(input.category) && !is_nonfiction_override(input.category);
        let subject_lang = language_from_category(input.category).or(input.page_language.and_then(determined));
        let rule_from_original = if input.original_title.trim().is_empty() {
            UNDETERMINED
        } else {
            detect_language(input.original_title)
        };
        let rule_hint = subject_lang.or(determined(rule_from_original));
        debug.push(format!(
            "041 $h: literature={} subject={} original={}",
            literature,
            subject_lang.unwrap_or(UNDETERMINED),
            rule_from_original
        ));

        let facts = input.facts();
        let mut candidate = if literature {
            rule_hint.unwrap_or(UNDETERMINED).to_string()
        } else {
            UNDETERMINED.to_string()
        };
        if candidate == UNDETERMINED {
            let guess = self.assistant.guess_original_language(&facts).await;
            debug.push(format!("041 $h by model: {} ({}; {})", guess.code, guess.reason, guess.signals));
            candidate = guess.code;
        }
        if !literature && candidate == UNDETERMINED {
            candidate = rule_hint.unwrap_or(UNDETERMINED).to_string();
        }

        let mut author_hint = None;
        if candidate == UNDETERMINED && !input.author.trim().is_empty() {
            let guess = self.assistant.guess_language_by_author(&facts).await;
            debug.push(format!("041 $h by author: {} ({})", guess.code, guess.reason));
            author_hint = Some(guess.code);
        }

        let settled = reconcile(&candidate, rule_hint, author_hint.as_deref());
        if settled != candidate {
            debug.push(format!("041 $h reconciled {} → {}", candidate, settled));
        }
        if is_allowed_code(&settled) {
            settled
        } else {
            UNDETERMINED.to_string()
        }
    }

    pub async fn decide(&self, input: &LanguageInput<'_>) -> LanguageDecision {
        let mut debug = Vec::new();
        let a = self.text_language(input, &mut debug).await;
        let h = self.original_language(input, &mut debug).await;
        let field_041 = build_041(&a, Some(&h));
        let field_546 = build_546(&field_041);
        LanguageDecision {
            original_language: field_041.get_subfield('h').map(str::to_string),
            text_language: a,
            field_041,
            field_546,
            debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;
    use crate::marc::Field;
    use crate::repository::{cache::NameCacheRepository, test_pool};
    use crate::services::llm::{LanguageModel, MockLanguageModel};
    use std::sync::Arc;

    async fn service(model: Option<MockLanguageModel>) -> LanguageService {
        let cache = NameCacheRepository::new(test_pool().await);
        LanguageService::new(Assistant::new(
            model.map(|m| Arc::new(m) as Arc<dyn LanguageModel>),
            cache,
            OpenAiConfig::default(),
        ))
    }

    #[test]
    fn test_reconcile() {
        assert_eq!(reconcile("eng", None, Some("rus")), "rus");
        assert_eq!(reconcile("eng", None, Some("und")), "eng");
        assert_eq!(reconcile("fre", Some("ger"), None), "ger");
        assert_eq!(reconcile("eng", Some("ger"), None), "eng");
        assert_eq!(reconcile("und", Some("und"), None), "und");
    }

    #[tokio::test]
    async fn test_literature_uses_category_without_model() {
        let svc = service(None).await;
        let decision = svc
            .decide(&LanguageInput {
                title: "죄와 벌",
                original_title: "Преступление и наказание",
                category: "국내도서>소설/시/희곡>러시아소설",
                ..Default::default()
            })
            .await;
        assert_eq!(decision.text_language, "kor");
        assert_eq!(decision.original_language.as_deref(), Some("rus"));
        assert_eq!(Field::from(decision.field_041).to_mrk(), "=041  1\\$akor$hrus");
        assert_eq!(decision.field_546.get_subfield('a'), Some("러시아어원작을 한국어로 번역"));
    }

    #[tokio::test]
    async fn test_korean_original_has_no_h() {
        let svc = service(None).await;
        let decision = svc
            .decide(&LanguageInput {
                title: "소년이 온다",
                category: "국내도서>소설/시/희곡>한국소설",
                ..Default::default()
            })
            .await;
        assert_eq!(decision.original_language, None);
        assert_eq!(Field::from(decision.field_041).to_mrk(), "=041  0\\$akor");
        assert_eq!(decision.field_546.get_subfield('a'), Some("한국어로 씀"));
    }

    #[tokio::test]
    async fn test_nonfiction_asks_model_first() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .withf(|r| r.system == "사서용 언어 추정기")
            .times(1)
            .returning(|_| Ok("$h=eng\n#reason=미국 저자".to_string()));
        let svc = service(Some(model)).await;
        let decision = svc
            .decide(&LanguageInput {
                title: "사피엔스",
                category: "국내도서>역사>세계사",
                author: "유발 하라리",
                ..Default::default()
            })
            .await;
        assert_eq!(decision.original_language.as_deref(), Some("eng"));
    }

    #[tokio::test]
    async fn test_english_title_asks_main_language() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .withf(|r| r.system == "사서용 본문 언어 추정기")
            .returning(|_| Ok("$a=eng".to_string()));
        model
            .expect_complete()
            .withf(|r| r.system != "사서용 본문 언어 추정기")
            .returning(|_| Ok("$h=und".to_string()));
        let svc = service(Some(model)).await;
        let decision = svc
            .decide(&LanguageInput {
                title: "Harry Potter",
                category: "외국도서>어린이>판타지",
                ..Default::default()
            })
            .await;
        assert_eq!(decision.text_language, "eng");
        assert_eq!(Field::from(decision.field_041).to_mrk(), "=041  0\\$aeng");
    }
}
