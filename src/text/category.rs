//! Aladin category path analysis (`국내도서>소설/시/희곡>일본소설`)

use once_cell::sync::Lazy;
use regex::Regex;

static PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[()]+").expect("valid regex"));
static PATH_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[>/\s]+").expect("valid regex"));

const LITERATURE_KO: &[&str] = &["문학", "소설", "시", "희곡"];
const LITERATURE_EN: &[&str] = &["literature", "fiction", "novel", "poetry", "poem", "drama", "play"];

const NONFICTION_KO: &[&str] = &[
    "역사", "근현대사", "서양사", "유럽사", "전기", "평전", "사회", "정치", "철학", "경제", "경영",
    "인문", "에세이", "수필",
];
const NONFICTION_EN: &[&str] = &[
    "history",
    "biography",
    "memoir",
    "politics",
    "philosophy",
    "economics",
    "science",
    "technology",
    "nonfiction",
    "essay",
    "essays",
];
const SCIENCE_KEYS: &[&str] = &["과학", "기술", "science", "technology"];

const CATEGORY_LANGUAGES: &[(&[&str], &str)] = &[
    (&["일본"], "jpn"),
    (&["중국"], "chi"),
    (&["영미", "영어", "아일랜드"], "eng"),
    (&["프랑스"], "fre"),
    (&["독일", "오스트리아"], "ger"),
    (&["러시아"], "rus"),
    (&["이탈리아"], "ita"),
    (&["스페인"], "spa"),
    (&["포르투갈"], "por"),
    (&["튀르키예", "터키"], "tur"),
];

/// Path tokens, with lowercase copies of Latin ones appended
pub fn tokenize_category(text: &str) -> Vec<String> {
    let t = PARENS.replace_all(text, " ");
    let tokens: Vec<String> = PATH_SEP
        .split(&t)
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    let lowered: Vec<String> = tokens
        .iter()
        .filter(|w| w.chars().any(|c| c.is_ascii_alphabetic()))
        .map(|w| w.to_lowercase())
        .collect();
    tokens.into_iter().chain(lowered).collect()
}

fn first_hit<'a>(tokens: &[String], keys: &[&'a str]) -> Option<&'a str> {
    keys.iter().copied().find(|k| tokens.iter().any(|t| t == k))
}

pub fn is_literature_top(category: &str) -> bool {
    category.contains("소설/시/희곡")
}

pub fn is_literature_category(category: &str) -> bool {
    let tokens = tokenize_category(category);
    first_hit(&tokens, LITERATURE_KO).is_some() || first_hit(&tokens, LITERATURE_EN).is_some()
}

/// Non-fiction signals that win over a literature-looking path.
/// Under the literature top level 과학/기술 are ignored so SF stays fiction.
pub fn is_nonfiction_override(category: &str) -> bool {
    let tokens = tokenize_category(category);
    if let Some(k) = first_hit(&tokens, NONFICTION_KO).or_else(|| first_hit(&tokens, NONFICTION_EN)) {
        tracing::debug!(keyword = k, "non-fiction keyword in category");
        return true;
    }
    if !is_literature_top(category) {
        if let Some(k) = first_hit(&tokens, SCIENCE_KEYS) {
            tracing::debug!(keyword = k, "science keyword outside literature");
            return true;
        }
    }
    false
}

/// Language suggested by a country or language name in the path
pub fn language_from_category(category: &str) -> Option<&'static str> {
    PATH_SEP.split(category).find_map(|word| {
        CATEGORY_LANGUAGES
            .iter()
            .find(|(keys, _)| keys.iter().any(|k| word.contains(k)))
            .map(|(_, code)| *code)
    })
}

pub fn is_domestic_category(category: &str) -> bool {
    category.contains("국내도서")
}

/// Last path segment, used as the subject hint for keywords
pub fn last_segment(category: &str) -> &str {
    category.rsplit('>').next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_category() {
        let tokens = tokenize_category("외국도서>Fiction(General)>소설/시");
        assert_eq!(
            tokens,
            vec!["외국도서", "Fiction", "General", "소설", "시", "fiction", "general"]
        );
    }

    #[test]
    fn test_literature_detection() {
        assert!(is_literature_category("국내도서>소설/시/희곡>일본소설"));
        assert!(is_literature_top("국내도서>소설/시/희곡>일본소설"));
        assert!(is_literature_category("외국도서>Poetry"));
        assert!(!is_literature_category("국내도서>경제경영>재테크"));
    }

    #[test]
    fn test_nonfiction_override() {
        assert!(is_nonfiction_override("국내도서>역사>서양사"));
        assert!(is_nonfiction_override("국내도서>과학>물리학"));
        assert!(!is_nonfiction_override("국내도서>소설/시/희곡>과학 소설"));
        assert!(!is_nonfiction_override("국내도서>소설/시/희곡>영미소설"));
    }

    #[test]
    fn test_language_from_category() {
        assert_eq!(language_from_category("국내도서>소설/시/희곡>일본소설"), Some("jpn"));
        assert_eq!(language_from_category("국내도서>소설/시/희곡>영미소설"), Some("eng"));
        assert_eq!(language_from_category("국내도서>소설/시/희곡>튀르키예소설"), Some("tur"));
        assert_eq!(language_from_category("국내도서>소설/시/희곡>한국소설"), None);
    }

    #[test]
    fn test_domestic_and_last_segment() {
        assert!(is_domestic_category("국내도서>소설/시/희곡"));
        assert!(!is_domestic_category("외국도서>Fiction"));
        assert_eq!(last_segment("국내도서>소설/시/희곡>한국소설"), "한국소설");
        assert_eq!(last_segment(""), "");
    }
}
