//! Title statement splitting for 245 and 246

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::aladin::AladinItem;

/// Top-level title/subtitle delimiters, tried in order at each position
const DELIMS: &[&str] = &[
    ": ", " : ", ":", " - ", " — ", "–", "—", "-", " · ", "·", "; ", ";", " | ", "|", "/",
];

const BRACKETS: &[(char, char)] = &[
    ('(', ')'),
    ('[', ']'),
    ('{', '}'),
    ('〈', '〉'),
    ('《', '》'),
    ('「', '」'),
    ('『', '』'),
    ('“', '”'),
    ('‘', '’'),
    ('«', '»'),
];

const PIECE_TRIM: &[char] = &[' ', '.', ',', '/', ';', ':', '-', '—', '·', '|'];

static INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{2000}-\u{200F}\u{202A}-\u{202E}]").expect("valid regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

static TRAIL_PAREN_NOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*[(\[](?:개정|증보|개역|전정|합본|전면개정|개정판|증보판|신판|보급판|최신개정판|개정증보판|국역|번역|영문판|초판|제?\d+\s*판|[^()\[\]]*총서[^()\[\]]*|[^()\[\]]*시리즈[^()\[\]]*)[)\]]\s*$",
    )
    .expect("valid regex")
});

static YEAR_OR_EDITION_PAREN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*\(\s*(?:\d{3,4}\s*년?|rev(?:ised)?\.?\s*ed\.?|\d+(?:st|nd|rd|th)\s*ed\.?|edition|ed\.?|제?\s*\d+\s*판|개정(?:증보)?판?|증보판|초판|신판|보급판)[^()\[\]]*\)\s*$",
    )
    .expect("valid regex")
});

static NUMERIC_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d+|[IVXLCDM]+)$").expect("valid regex"));
static TRAIL_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[(\[]\s*([^()\[\]]+?)\s*[)\]]\s*$").expect("valid regex"));
static BRACKET_PART_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:제?\s*\d+\s*(?:권|부|편|책)|[IVXLCDM]+|[상중하전후])$").expect("valid regex")
});
static TRAIL_PART_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(제?\s*\d+\s*(?:권|부|편|책))\s*$").expect("valid regex"));
static TRAIL_KOREAN_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([상중하전후])\s*$").expect("valid regex"));
static TRAIL_ROMAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([IVXLCDM]+)\s*$").expect("valid regex"));
static TRAIL_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)(\s*(\d{1,3}))\s*$").expect("valid regex"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([:;,./])").expect("valid regex"));
static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.:;,/]\s*$").expect("valid regex"));

/// Title proper, part designation and remainder of title
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleStatement {
    pub a: String,
    pub n: Option<String>,
    pub b: Option<String>,
}

/// Fold fullwidth punctuation, drop direction/zero-width marks, collapse whitespace
pub fn compat_normalize(s: &str) -> String {
    let s = s
        .replace('：', ":")
        .replace('－', "-")
        .replace('‧', "·")
        .replace('／', "/");
    let s = INVISIBLE.replace_all(&s, "");
    SPACES.replace_all(&s, " ").trim().to_string()
}

fn trim_piece(s: &str) -> &str {
    s.trim_matches(PIECE_TRIM)
}

fn trim_piece_end(s: &str) -> &str {
    s.trim_end_matches(PIECE_TRIM)
}

/// Remove a trailing bracketed edition or series note
pub fn strip_trailing_paren_notes(s: &str) -> String {
    let stripped = TRAIL_PAREN_NOTE.replace(s, "");
    trim_piece(&stripped).to_string()
}

pub fn clean_piece(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let s = compat_normalize(s);
    let s = strip_trailing_paren_notes(&s);
    trim_piece(&s).to_string()
}

/// Byte offset and delimiter of the first split point outside brackets
pub fn find_top_level_split(text: &str) -> Option<(usize, &'static str)> {
    let mut stack: Vec<char> = Vec::new();
    for (i, ch) in text.char_indices() {
        if let Some(&(_, close)) = BRACKETS.iter().find(|(open, _)| *open == ch) {
            stack.push(close);
            continue;
        }
        if BRACKETS.iter().any(|(_, close)| *close == ch) {
            if stack.last() == Some(&ch) {
                stack.pop();
            }
            continue;
        }
        if stack.is_empty() {
            let rest = &text[i..];
            if let Some(d) = DELIMS.iter().find(|d| rest.starts_with(**d)) {
                return Some((i, *d));
            }
        }
    }
    None
}

/// Split a bare title into title proper and remainder
pub fn split_title(title: &str) -> (String, Option<String>) {
    let t = compat_normalize(title);
    match find_top_level_split(&t) {
        None => (clean_piece(&t), None),
        Some((idx, delim)) => {
            let left = clean_piece(&t[..idx]);
            let right = clean_piece(&t[idx + delim.len()..]);
            if left.is_empty() {
                return (clean_piece(&t), None);
            }
            (left, Some(right).filter(|r| !r.is_empty()))
        }
    }
}

fn first_digits(s: &str) -> Option<String> {
    DIGITS.find(s).map(|m| m.as_str().to_string())
}

/// Separate a trailing volume designation from the title proper
pub fn split_part_suffix(a_raw: &str, series_evidence: bool) -> (String, Option<String>) {
    let a = clean_piece(a_raw);
    if a.is_empty() {
        return (a, None);
    }
    if NUMERIC_TITLE.is_match(&a) {
        return (a, None);
    }

    let split = |start: usize, n: String| -> Option<(String, Option<String>)> {
        let base = trim_piece_end(&a[..start]).to_string();
        (!base.is_empty()).then_some((base, Some(n)))
    };

    if let Some(caps) = TRAIL_BRACKET.captures(&a) {
        let token = caps[1].trim();
        if BRACKET_PART_LABEL.is_match(token) {
            let n = first_digits(token).unwrap_or_else(|| token.to_string());
            if let Some(out) = split(caps.get(0).map_or(0, |m| m.start()), n) {
                return out;
            }
        }
    }

    if let Some(caps) = TRAIL_PART_LABEL.captures(&a) {
        let label = caps[1].trim();
        let n = first_digits(label).unwrap_or_else(|| label.to_string());
        if let Some(out) = split(caps.get(0).map_or(0, |m| m.start()), n) {
            return out;
        }
    }

    for re in [&*TRAIL_KOREAN_PART, &*TRAIL_ROMAN] {
        if let Some(caps) = re.captures(&a) {
            if let Some(out) = split(caps.get(0).map_or(0, |m| m.start()), caps[1].to_string()) {
                return out;
            }
        }
    }

    if series_evidence {
        if let Some(caps) = TRAIL_NUMBER.captures(&a) {
            if let Some(out) = split(caps.get(1).map_or(0, |m| m.start()), caps[2].to_string()) {
                return out;
            }
        }
    }

    (a, None)
}

/// 245 $a/$n/$b from an Aladin item
pub fn extract_title_statement(item: &AladinItem) -> TitleStatement {
    let t = compat_normalize(&item.title);
    let sub = clean_piece(&item.sub_info.sub_title);

    let (a0, b) = if sub.is_empty() {
        split_title(&t)
    } else {
        let tails = [
            format!(" : {}", sub),
            format!(": {}", sub),
            format!(":{}", sub),
            format!(" - {}", sub),
            format!("- {}", sub),
            format!("-{}", sub),
        ];
        let removed = tails
            .iter()
            .find_map(|tail| t.strip_suffix(tail.as_str()))
            .unwrap_or(&t);
        let a0 = Some(clean_piece(removed))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| clean_piece(&t));
        (a0, Some(sub))
    };

    let (a, n) = split_part_suffix(&a0, item.has_series_evidence());
    TitleStatement { a, n, b }
}

/// Title proper without ISBD punctuation, as used for 940 readings
pub fn reading_title(a: &str) -> String {
    let t = SPACE_BEFORE_PUNCT.replace_all(a.trim(), "$1");
    TRAILING_PUNCT.replace(t.trim(), "").trim().to_string()
}

/// Original title for 246, without year or edition notes
pub fn clean_original_title(orig: &str) -> Option<String> {
    let orig = clean_piece(orig.trim());
    let orig = YEAR_OR_EDITION_PAREN.replace(&orig, "").trim().to_string();
    (!orig.is_empty()).then_some(orig)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, sub: &str) -> AladinItem {
        let mut item = AladinItem {
            title: title.to_string(),
            ..Default::default()
        };
        item.sub_info.sub_title = sub.to_string();
        item
    }

    #[test]
    fn test_compat_normalize() {
        assert_eq!(compat_normalize("가나：다\u{200B}라   마"), "가나:다라 마");
    }

    #[test]
    fn test_clean_piece_strips_edition_notes() {
        assert_eq!(clean_piece("데미안 (개정판)"), "데미안");
        assert_eq!(clean_piece("코스모스 [세계문학 시리즈]"), "코스모스");
        assert_eq!(clean_piece(" 제목 / "), "제목");
    }

    #[test]
    fn test_split_ignores_delimiters_inside_brackets() {
        assert_eq!(find_top_level_split("『가:나』 다: 라"), Some((17, ": ")));
        assert_eq!(find_top_level_split("(a-b)"), None);
    }

    #[test]
    fn test_split_title() {
        assert_eq!(
            split_title("역사의 쓸모 : 자유롭고 떳떳한 삶을 위한 인문학"),
            ("역사의 쓸모".to_string(), Some("자유롭고 떳떳한 삶을 위한 인문학".to_string()))
        );
        assert_eq!(split_title("파친코"), ("파친코".to_string(), None));
    }

    #[test]
    fn test_subtitle_tail_removed() {
        let st = extract_title_statement(&item("아몬드 - 손원평 장편소설", "손원평 장편소설"));
        assert_eq!(st.a, "아몬드");
        assert_eq!(st.b.as_deref(), Some("손원평 장편소설"));
        assert_eq!(st.n, None);
    }

    #[test]
    fn test_part_suffixes() {
        assert_eq!(split_part_suffix("토지 제3권", false), ("토지".into(), Some("3".into())));
        assert_eq!(split_part_suffix("삼국지 (2권)", false), ("삼국지".into(), Some("2".into())));
        assert_eq!(split_part_suffix("태백산맥 상", false), ("태백산맥".into(), Some("상".into())));
        assert_eq!(split_part_suffix("로마인 이야기 IV", false), ("로마인 이야기".into(), Some("IV".into())));
        assert_eq!(split_part_suffix("1984", true), ("1984".into(), None));
        assert_eq!(split_part_suffix("여자전", false), ("여자전".into(), None));
        assert_eq!(split_part_suffix("Basic", false), ("Basic".into(), None));
    }

    #[test]
    fn test_trailing_number_needs_series_evidence() {
        assert_eq!(split_part_suffix("해리 포터 2", false), ("해리 포터 2".into(), None));
        assert_eq!(split_part_suffix("해리 포터 2", true), ("해리 포터".into(), Some("2".into())));
        assert_eq!(split_part_suffix("트렌드 코리아 2024", true), ("트렌드 코리아 2024".into(), None));
        assert_eq!(split_part_suffix("수학의 정석 12", true), ("수학의 정석".into(), Some("12".into())));
    }

    #[test]
    fn test_reading_title() {
        assert_eq!(reading_title("챗GPT 활용법 :"), "챗GPT 활용법");
        assert_eq!(reading_title("AI 시대 ."), "AI 시대");
    }

    #[test]
    fn test_clean_original_title() {
        assert_eq!(
            clean_original_title("The Road (2006)").as_deref(),
            Some("The Road")
        );
        assert_eq!(
            clean_original_title("Sapiens (2nd ed.)").as_deref(),
            Some("Sapiens")
        );
        assert_eq!(clean_original_title("  "), None);
    }
}
