//! 653 uncontrolled index terms
//!
//! Keywords come from the language model; words from the title or the
//! author statement are never kept.

use std::collections::BTreeSet;

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::category::last_segment;

pub const MAX_KEYWORDS: usize = 7;

static NON_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\x{AC00}-\x{D7A3}]").expect("valid regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static FALLBACK_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\n]").expect("valid regex"));

/// NFKC, lowercase, letters digits and spaces only
pub fn norm(text: &str) -> String {
    let lowered = text.nfkc().collect::<String>().to_lowercase();
    let cleaned = NON_TEXT.replace_all(&lowered, " ");
    SPACES.replace_all(&cleaned, " ").trim().to_string()
}

/// Tokens of the title and author statement a keyword must not repeat
pub fn forbidden_set(title: &str, authors: &str) -> BTreeSet<String> {
    let mut forbidden = BTreeSet::new();
    for source in [norm(title), norm(authors)] {
        if source.is_empty() {
            continue;
        }
        forbidden.extend(source.split(' ').map(str::to_string));
        forbidden.insert(source.replace(' ', ""));
    }
    forbidden.retain(|f| f.chars().count() >= 2);
    forbidden
}

pub fn should_keep(keyword: &str, forbidden: &BTreeSet<String>) -> bool {
    let n = norm(keyword);
    if n.replace(' ', "").chars().count() < 2 {
        return false;
    }
    !forbidden
        .iter()
        .any(|tok| n.contains(tok.as_str()) || tok.contains(n.as_str()))
}

/// Keywords of a model reply, written as `$a키워드1 $a키워드2`
pub fn parse_keyword_line(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.contains("$a") {
        let from_marker: Vec<String> = raw
            .split("$a")
            .skip(1)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !from_marker.is_empty() {
            return from_marker;
        }
    }
    FALLBACK_SPLIT
        .split(raw)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_start_matches("$a").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn finalize_keywords(keywords: Vec<String>, forbidden: &BTreeSet<String>) -> Vec<String> {
    let mut seen: IndexSet<String> = IndexSet::new();
    let mut out = Vec::new();
    for kw in keywords {
        let kw = kw.replace(' ', "");
        if !should_keep(&kw, forbidden) {
            continue;
        }
        if seen.insert(norm(&kw)) {
            out.push(kw);
        }
        if out.len() == MAX_KEYWORDS {
            break;
        }
    }
    out
}

/// Inputs of the keyword prompt
#[derive(Debug, Clone, Default)]
pub struct KeywordSource<'a> {
    pub category: &'a str,
    pub title: &'a str,
    pub authors: &'a str,
    pub description: &'a str,
    pub toc: &'a str,
}

pub const KEYWORD_SYSTEM_PROMPT: &str = "당신은 도서관 메타데이터 전문가입니다. \
책의 분류, 설명, 목차를 바탕으로 MARC 653 주제어를 도출하세요. \
서명(245)·저자(100/700)에 존재하는 단어는 제외합니다.";

pub fn keyword_prompt(src: &KeywordSource<'_>, forbidden: &BTreeSet<String>) -> String {
    let forbidden_list = if forbidden.is_empty() {
        "(없음)".to_string()
    } else {
        forbidden.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    format!(
        "입력 정보로부터 최대 {max}개의 MARC 653 주제어를 한 줄로 출력해 주세요.\n\n\
         - 분류: \"{cat}\"\n\
         - 제목(245): \"{title}\"\n\
         - 저자(100/700): \"{authors}\"\n\
         - 설명: \"{desc}\"\n\
         - 목차: \"{toc}\"\n\n\
         제외어 목록(서명/저자에서 유래): {forbidden_list}\n\n\
         규칙:\n\
         1) '제목'과 '저자'에 쓰인 단어·표현은 절대 포함하지 마세요.\n\
         2) 분류/설명/목차에서 핵심 개념을 명사 중심으로 뽑으세요.\n\
         3) 출력 형식: $a키워드1 $a키워드2 … (한 줄)\n",
        max = MAX_KEYWORDS,
        cat = last_segment(src.category),
        title = src.title,
        authors = src.authors,
        desc = src.description,
        toc = src.toc,
        forbidden_list = forbidden_list,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm() {
        assert_eq!(norm("  Ｈｅｌｌｏ,  세계!! "), "hello 세계");
        assert_eq!(norm(""), "");
    }

    #[test]
    fn test_forbidden_set() {
        let f = forbidden_set("죽음 트릴로지", "김 작가");
        assert!(f.contains("죽음"));
        assert!(f.contains("트릴로지"));
        assert!(f.contains("죽음트릴로지"));
        assert!(f.contains("작가"));
        assert!(!f.contains("김"));
    }

    #[test]
    fn test_should_keep() {
        let f = forbidden_set("죽음 트릴로지", "");
        assert!(!should_keep("죽음", &f));
        assert!(!should_keep("죽음의철학", &f));
        assert!(!should_keep("가", &f));
        assert!(should_keep("실존주의", &f));
    }

    #[test]
    fn test_parse_keyword_line() {
        assert_eq!(
            parse_keyword_line("$a실존주의 $a 윤리학$a죽음"),
            vec!["실존주의", "윤리학", "죽음"]
        );
        assert_eq!(parse_keyword_line("실존주의, 윤리학\n죽음"), vec!["실존주의", "윤리학", "죽음"]);
    }

    #[test]
    fn test_finalize_keywords() {
        let f = forbidden_set("죽음 트릴로지", "");
        let kws = vec![
            "실존 주의".to_string(),
            "실존주의".to_string(),
            "죽음".to_string(),
            "윤리학".to_string(),
        ];
        assert_eq!(finalize_keywords(kws, &f), vec!["실존주의", "윤리학"]);

        let many: Vec<String> = (0..10).map(|i| format!("주제{}", i)).collect();
        assert_eq!(finalize_keywords(many, &BTreeSet::new()).len(), MAX_KEYWORDS);
    }

    #[test]
    fn test_prompt_mentions_forbidden_words() {
        let f = forbidden_set("죽음 트릴로지", "");
        let src = KeywordSource {
            category: "국내도서>인문학>철학",
            title: "죽음 트릴로지",
            ..Default::default()
        };
        let prompt = keyword_prompt(&src, &f);
        assert!(prompt.contains("분류: \"철학\""));
        assert!(prompt.contains("죽음, 죽음트릴로지, 트릴로지"));
    }
}
