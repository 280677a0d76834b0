//! Hangul readings of titles for 940
//!
//! Digits and common English words in a title are spelled out the way a
//! Korean reader would say them, so the catalogue can be searched by sound.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::script::has_hangul;

pub const EN_KO_MAP: &[(&str, &str)] = &[
    ("chatgpt", "챗지피티"),
    ("gpt", "지피티"),
    ("ai", "에이아이"),
    ("api", "에이피아이"),
    ("ml", "엠엘"),
    ("nlp", "엔엘피"),
    ("llm", "엘엘엠"),
    ("excel", "엑셀"),
    ("youtube", "유튜브"),
];

pub const DECIMAL_MAP: &[(&str, &str)] = &[("2.0", "이점영"), ("3.0", "삼점영"), ("4.0", "사점영")];

const SINO: [&str; 10] = ["영", "일", "이", "삼", "사", "오", "육", "칠", "팔", "구"];
const ZERO_ALT: [&str; 2] = ["영", "공"];

pub const MAX_940_LINES: usize = 6;
pub const MAX_AI_READINGS: usize = 4;

static ENGLISH_WORD: Lazy<Regex> = Lazy::new(|| {
    let alts: Vec<String> = EN_KO_MAP.iter().map(|(en, _)| regex::escape(en)).collect();
    Regex::new(&format!(r"(?i)\b({})\b", alts.join("|"))).expect("valid regex")
});
static NUMBER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2,}").expect("valid regex"));
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([:;,./])").expect("valid regex"));
static ASCII_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9A-Za-z]").expect("valid regex"));
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[).\s-]*").expect("valid regex"));

pub fn replace_decimals(text: &str) -> String {
    DECIMAL_MAP
        .iter()
        .fold(text.to_string(), |acc, (k, v)| acc.replace(k, v))
}

pub fn replace_english(text: &str) -> String {
    ENGLISH_WORD
        .replace_all(text, |caps: &Captures| {
            let word = caps[0].to_lowercase();
            EN_KO_MAP
                .iter()
                .find(|(en, _)| *en == word)
                .map(|(_, ko)| ko.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Reading of a number below 10000, `일` omitted before 천/백/십
fn read_below_10k(n: u64) -> String {
    let mut out = String::new();
    for (div, unit) in [(1000, "천"), (100, "백"), (10, "십")] {
        let d = (n / div % 10) as usize;
        if d == 1 {
            out.push_str(unit);
        } else if d > 1 {
            out.push_str(SINO[d]);
            out.push_str(unit);
        }
    }
    let ones = (n % 10) as usize;
    if ones > 0 {
        out.push_str(SINO[ones]);
    }
    out
}

/// Sino-Korean cardinal reading; digit reading when the number is too long
pub fn read_cardinal(num: &str) -> String {
    let Ok(mut n) = num.parse::<u64>() else {
        return read_digits(num, "영");
    };
    if n == 0 {
        return SINO[0].to_string();
    }
    let mut groups = Vec::new();
    for unit in ["", "만", "억", "조", "경"] {
        if n == 0 {
            break;
        }
        let chunk = n % 10_000;
        if chunk > 0 {
            let head = if unit == "만" && chunk == 1 {
                String::new()
            } else {
                read_below_10k(chunk)
            };
            groups.push(format!("{}{}", head, unit));
        }
        n /= 10_000;
    }
    groups.reverse();
    groups.concat()
}

/// Digit-by-digit reading with the given word for zero
pub fn read_digits(num: &str, zero: &str) -> String {
    num.chars()
        .map(|c| match c.to_digit(10) {
            Some(0) => zero.to_string(),
            Some(d) => SINO[d as usize].to_string(),
            None => c.to_string(),
        })
        .collect()
}

fn readings_of(num: &str) -> Vec<String> {
    let mut local: IndexSet<String> = IndexSet::new();
    local.insert(read_cardinal(num));
    for zero in ZERO_ALT {
        local.insert(read_digits(num, zero));
    }
    let mut out: Vec<String> = local.into_iter().collect();
    out.sort_by_key(|s| s.chars().count());
    out
}

/// Replace the `nth` run of 2+ digits in `text`
fn replace_nth_number(text: &str, nth: usize, expected: &str, with: &str) -> String {
    let mut idx = 0;
    NUMBER_RUN
        .replace_all(text, |caps: &Captures| {
            let m = &caps[0];
            let hit = idx == nth && m == expected;
            idx += 1;
            if hit {
                with.to_string()
            } else {
                m.to_string()
            }
        })
        .into_owned()
}

/// Rule-based Hangul readings of a title, shortest first
pub fn generate_title_variants(title: &str, max_variants: usize) -> Vec<String> {
    let base0 = title.trim().to_string();
    let base = replace_english(&replace_decimals(&base0));

    let mut variants: IndexSet<String> = IndexSet::new();
    variants.insert(base0.clone());
    variants.insert(base.clone());

    // digit runs in the base, after decimals became words
    let nums: Vec<String> = NUMBER_RUN
        .find_iter(&base)
        .map(|m| m.as_str().to_string())
        .collect();
    if !nums.is_empty() {
        let mut work: IndexSet<String> = IndexSet::new();
        work.insert(base.clone());
        for num in &nums {
            let mut next = IndexSet::new();
            for w in &work {
                for reading in readings_of(num) {
                    // earlier runs are already spelled out, so this one is always first
                    next.insert(replace_nth_number(w, 0, num, &reading));
                }
            }
            work = next;
        }
        variants.extend(work);
    }

    let mut out: Vec<String> = variants
        .into_iter()
        .filter(|v| !v.is_empty())
        .map(|v| SPACE_BEFORE_PUNCT.replace_all(&v, "$1").trim().to_string())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect();
    out.sort_by(|a, b| (a.chars().count(), a).cmp(&(b.chars().count(), b)));
    out.truncate(max_variants);
    out
}

/// Only titles with Latin letters or digits get readings
pub fn needs_reading(title_a: &str) -> bool {
    ASCII_ALNUM.is_match(title_a.trim())
}

fn adds_punctuation(base: &str, v: &str) -> bool {
    let new_colon = v.contains(':') && !base.contains(':');
    let new_dash = v.contains(" - ") && !base.contains(" - ") && !base.contains('-');
    new_colon || new_dash
}

pub fn ai_reading_cache_key(title_a: &str) -> String {
    format!("ai940|strict|{}", title_a)
}

/// Keep the model lines that are Hangul readings without new punctuation
pub fn filter_ai_readings(title_a: &str, raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| LIST_MARKER.replace(l, "").trim().to_string())
        .filter(|l| has_hangul(l) && !adds_punctuation(title_a, l))
        .collect()
}

/// 940 readings for a 245 $a; with `$n` present digits are left alone
pub fn readings_940(title_a: &str, has_part_number: bool, ai_readings: &[String]) -> Vec<String> {
    let base = title_a.trim();
    if base.is_empty() || !needs_reading(base) {
        return Vec::new();
    }

    let mut variants = if has_part_number {
        vec![replace_english(base)]
    } else {
        generate_title_variants(base, 5)
    };
    variants.extend(ai_readings.iter().take(MAX_AI_READINGS).cloned());

    let mut seen: IndexSet<String> = IndexSet::new();
    for v in variants {
        let v = v.trim();
        if v.is_empty() || v == base || adds_punctuation(base, v) {
            continue;
        }
        seen.insert(v.to_string());
    }
    seen.into_iter().take(MAX_940_LINES).collect()
}

pub const AI_READING_SYSTEM_PROMPT: &str = "역할: 한국어 도서 서명 '발음 표기 생성기'. \
주어진 본표제(245 $a)에서 숫자/영문만 한국어 발음으로 치환하라. \
입력에 없는 단어/부제($b) 추가 금지. 콜론(:), 대시(-) 등 새 구두점 추가 금지. \
각 줄에 1개 변형만, 순수 텍스트만 출력.";

pub fn ai_reading_prompt(title_a: &str) -> String {
    format!(
        "본표제(245 $a): {}\n예: 2025→이천이십오, 2.0→이점영, ChatGPT→챗지피티",
        title_a
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cardinal() {
        assert_eq!(read_cardinal("2025"), "이천이십오");
        assert_eq!(read_cardinal("1984"), "천구백팔십사");
        assert_eq!(read_cardinal("10"), "십");
        assert_eq!(read_cardinal("110"), "백십");
        assert_eq!(read_cardinal("10000"), "만");
        assert_eq!(read_cardinal("25000"), "이만오천");
        assert_eq!(read_cardinal("100000000"), "일억");
        assert_eq!(read_cardinal("00"), "영");
    }

    #[test]
    fn test_read_digits() {
        assert_eq!(read_digits("2025", "영"), "이영이오");
        assert_eq!(read_digits("2025", "공"), "이공이오");
    }

    #[test]
    fn test_replace_english_whole_words() {
        assert_eq!(replace_english("ChatGPT 활용법"), "챗지피티 활용법");
        assert_eq!(replace_english("AI 시대"), "에이아이 시대");
        assert_eq!(replace_english("Said"), "Said");
    }

    #[test]
    fn test_variants_cover_each_reading() {
        let v = generate_title_variants("트렌드 코리아 2025", 10);
        assert!(v.contains(&"트렌드 코리아 이천이십오".to_string()));
        assert!(v.contains(&"트렌드 코리아 이영이오".to_string()));
        assert!(v.contains(&"트렌드 코리아 이공이오".to_string()));
        assert!(v.contains(&"트렌드 코리아 2025".to_string()));
    }

    #[test]
    fn test_variants_sorted_and_truncated() {
        let v = generate_title_variants("웹 2.0 시대 10년", 3);
        assert_eq!(v.len(), 3);
        for pair in v.windows(2) {
            assert!(pair[0].chars().count() <= pair[1].chars().count());
        }
    }

    #[test]
    fn test_readings_940_rules() {
        assert!(readings_940("채식주의자", false, &[]).is_empty());

        let lines = readings_940("ChatGPT 2025", false, &[]);
        assert!(!lines.contains(&"ChatGPT 2025".to_string()));
        assert!(lines.contains(&"챗지피티 이천이십오".to_string()));
        assert!(lines.len() <= MAX_940_LINES);

        let lines = readings_940("AI 수업 2", true, &[]);
        assert_eq!(lines, vec!["에이아이 수업 2"]);
    }

    #[test]
    fn test_ai_readings_filtered() {
        let raw = "1. 에이아이 시대: 새 장\n2) 에이아이 시대\nAI era";
        assert_eq!(filter_ai_readings("AI 시대", raw), vec!["에이아이 시대"]);

        let lines = readings_940("AI 시대", false, &["에이아이 시대".to_string()]);
        assert_eq!(lines, vec!["에이아이 시대"]);
    }
}
