//! Script detection and language guessing from characters

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\W_]+").expect("valid regex"));

/// ISDS language codes and their Korean names
pub const ISDS_LANGUAGES: &[(&str, &str)] = &[
    ("kor", "한국어"),
    ("eng", "영어"),
    ("jpn", "일본어"),
    ("chi", "중국어"),
    ("rus", "러시아어"),
    ("ara", "아랍어"),
    ("fre", "프랑스어"),
    ("ger", "독일어"),
    ("ita", "이탈리아어"),
    ("spa", "스페인어"),
    ("por", "포르투갈어"),
    ("tur", "터키어"),
    ("und", "알 수 없음"),
];

pub const UNDETERMINED: &str = "und";

/// Korean name of an ISDS code, `알 수 없음` for unknown codes
pub fn language_name(code: &str) -> &'static str {
    ISDS_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("알 수 없음")
}

/// Codes a guess may resolve to
pub fn is_allowed_code(code: &str) -> bool {
    code != UNDETERMINED && ISDS_LANGUAGES.iter().any(|(c, _)| *c == code)
}

fn in_ranges(c: char, ranges: &[(u32, u32)]) -> bool {
    let cp = c as u32;
    ranges.iter().any(|&(lo, hi)| lo <= cp && cp <= hi)
}

const CYRILLIC: &[(u32, u32)] = &[(0x0400, 0x04FF), (0x0500, 0x052F)];
const EAST_ASIAN_OR_GREEK: &[(u32, u32)] = &[
    (0x3040, 0x309F),
    (0x30A0, 0x30FF),
    (0x4E00, 0x9FFF),
    (0x0370, 0x03FF),
];
const ARABIC_OR_DEVANAGARI: &[(u32, u32)] = &[(0x0600, 0x06FF), (0x0900, 0x097F)];
const LATIN_EXTENDED: &[(u32, u32)] = &[(0x00C0, 0x024F)];
const HANGUL: &[(u32, u32)] = &[(0xAC00, 0xD7A3), (0x1100, 0x11FF), (0x3130, 0x318F)];

fn has_any(s: &str, ranges: &[(u32, u32)]) -> bool {
    s.chars().any(|c| in_ranges(c, ranges))
}

pub fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

pub fn has_hangul(s: &str) -> bool {
    has_any(s, HANGUL)
}

pub fn is_kana(c: char) -> bool {
    ('\u{3040}'..='\u{30FF}').contains(&c)
}

/// Preference rank for picking an original-script label; lower is better, Hangul is 9.
pub fn script_rank(s: &str) -> u8 {
    if has_any(s, CYRILLIC) {
        1
    } else if has_any(s, EAST_ASIAN_OR_GREEK) {
        2
    } else if has_any(s, ARABIC_OR_DEVANAGARI) {
        3
    } else if has_any(s, LATIN_EXTENDED) {
        4
    } else if s.chars().any(|c| c.is_ascii_alphabetic()) {
        5
    } else if has_hangul(s) {
        9
    } else {
        8
    }
}

/// Best non-Hangul label, preferring native scripts over Latin
pub fn pick_non_hangul_label<'a, I>(labels: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    labels
        .into_iter()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| script_rank(l) != 9)
        .min_by_key(|l| script_rank(l))
        .map(str::to_string)
}

/// 2 to 4 Hangul syllables, optionally spaced or dotted
pub fn looks_korean_person_name(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }
    let mut syllables = 0;
    for c in s.chars() {
        if is_hangul_syllable(c) {
            syllables += 1;
        } else if !(c.is_whitespace() || c == '·') {
            return false;
        }
    }
    (2..=4).contains(&syllables)
}

/// Language of a text, judged by its first letter
pub fn detect_language_by_script(text: &str) -> &'static str {
    let stripped = NON_WORD.replace_all(text, "");
    let Some(c) = stripped.chars().next() else {
        return UNDETERMINED;
    };
    match c {
        '\u{AC00}'..='\u{D7A3}' => "kor",
        '\u{3040}'..='\u{30FF}' => "jpn",
        '\u{4E00}'..='\u{9FFF}' => "chi",
        '\u{0400}'..='\u{04FF}' => "rus",
        '\u{0600}'..='\u{06FF}' => "ara",
        '\u{0E00}'..='\u{0E7F}' => "tha",
        c if c.is_ascii_alphabetic() => "eng",
        _ => UNDETERMINED,
    }
}

/// Refine a script-based guess with language names and accented letters
pub fn override_language_by_keywords(text: &str, initial: &'static str) -> &'static str {
    let lower = text.to_lowercase();
    if initial == "chi" && lower.chars().any(is_kana) {
        return "jpn";
    }
    if initial != UNDETERMINED && initial != "eng" {
        return initial;
    }
    let named = [
        (["spanish", "español"], "spa"),
        (["italian", "italiano"], "ita"),
        (["french", "français"], "fre"),
        (["portuguese", "português"], "por"),
        (["german", "deutsch"], "ger"),
    ];
    for (words, code) in named {
        if words.iter().any(|w| lower.contains(w)) {
            return code;
        }
    }
    let accented = [
        (&['é', 'è', 'ê', 'à', 'ç', 'ù', 'ô', 'â', 'î', 'û'][..], "fre"),
        (&['ñ', 'á', 'í', 'ó', 'ú'][..], "spa"),
        (&['ã', 'õ'][..], "por"),
    ];
    for (chars, code) in accented {
        if lower.chars().any(|c| chars.contains(&c)) {
            return code;
        }
    }
    initial
}

pub fn detect_language(text: &str) -> &'static str {
    override_language_by_keywords(text, detect_language_by_script(text))
}
