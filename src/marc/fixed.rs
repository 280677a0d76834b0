//! 008 fixed-length data elements for books
//!
//! The body is always 40 characters:
//!
//! | pos   | element                        |
//! |-------|--------------------------------|
//! | 00-05 | date entered (YYMMDD)          |
//! | 06    | type of date                   |
//! | 07-10 | date 1                         |
//! | 11-14 | date 2                         |
//! | 15-17 | place of publication           |
//! | 18-21 | illustrations                  |
//! | 22-27 | target/form/contents (blank)   |
//! | 28    | modified record                |
//! | 29    | conference publication (`0`)   |
//! | 30    | festschrift (`0`)              |
//! | 31    | index                          |
//! | 32    | cataloging source              |
//! | 33    | literary form                  |
//! | 34    | biography                      |
//! | 35-37 | language                       |
//! | 38-39 | blank                          |

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};

pub const UNKNOWN_DATE1: &str = "19uu";
pub const DEFAULT_LANGUAGE: &str = "kor";

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(19|20)\d{2}").expect("valid regex"));

static ILLUS_A: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)삽화|삽도|도해|일러스트|그림|illustration").expect("valid regex"));
static ILLUS_D: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)도표|표|차트|그래프|chart|graph").expect("valid regex"));
static ILLUS_O: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)사진|포토|화보|photo|컬러사진|칼라사진").expect("valid regex"));
static INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)색인|찾아보기|index").expect("valid regex"));

static LIT_LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)서간집|편지|서간문|letters?").expect("valid regex"));
static LIT_TRAVEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)기행|여행기|여행 에세이|일기|수기|diary|travel").expect("valid regex"));
static LIT_POETRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)시집|산문시|poem|poetry").expect("valid regex"));
static LIT_FICTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)소설|장편|중단편|novel|fiction").expect("valid regex"));
static LIT_ESSAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)에세이|수필|essay").expect("valid regex"));

static BIO_AUTO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)자서전|회고록|autobiograph").expect("valid regex"));
static BIO_FULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)전기|평전|biograph").expect("valid regex"));
static BIO_PARTIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"전기적|자전적|회고|회상").expect("valid regex"));

/// 008 for a single-date monograph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixed008 {
    pub date_entered: String,
    pub type_of_date: char,
    pub date1: String,
    pub date2: String,
    pub country: String,
    pub illustrations: String,
    pub modified_record: char,
    pub has_index: bool,
    pub cataloging_source: char,
    pub literary_form: char,
    pub biography: char,
    pub language: String,
}

/// Truncate or right-pad with blanks to exactly `n` characters
fn pad(s: &str, n: usize) -> String {
    let mut out: String = s.chars().take(n).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(n - len));
    out
}

impl Fixed008 {
    /// Build with default codes; fails unless `date_entered` is YYMMDD and `date1` has 4 characters.
    pub fn new(date_entered: &str, date1: &str) -> AppResult<Self> {
        if date_entered.len() != 6 || !date_entered.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation(format!(
                "008 date entered must be YYMMDD, got '{}'",
                date_entered
            )));
        }
        if date1.chars().count() != 4 {
            return Err(AppError::Validation(format!(
                "008 date 1 must be 4 characters, got '{}'",
                date1
            )));
        }
        Ok(Self {
            date_entered: date_entered.to_string(),
            type_of_date: 's',
            date1: date1.to_string(),
            date2: String::new(),
            country: "xxu".to_string(),
            illustrations: String::new(),
            modified_record: ' ',
            has_index: false,
            cataloging_source: 'a',
            literary_form: ' ',
            biography: ' ',
            language: DEFAULT_LANGUAGE.to_string(),
        })
    }

    /// Build for a book entered on `today`, filling the content codes from the descriptive text.
    pub fn for_book(today: NaiveDate, pub_date: &str, text: &BookText<'_>) -> AppResult<Self> {
        let date_entered = today.format("%y%m%d").to_string();
        let mut fixed = Self::new(&date_entered, &extract_year(pub_date))?;
        let blob = text.blob();
        fixed.illustrations = detect_illustrations(&blob);
        fixed.has_index = detect_index(&blob);
        fixed.literary_form = detect_literary_form(text.title, text.category, &blob);
        fixed.biography = detect_biography(&blob);
        Ok(fixed)
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = country.to_string();
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        if !language.trim().is_empty() {
            self.language = language.to_string();
        }
        self
    }

    pub fn render(&self) -> String {
        let mut body = String::with_capacity(40);
        body.push_str(&self.date_entered);
        body.push(self.type_of_date);
        body.push_str(&self.date1);
        body.push_str(&pad(&self.date2, 4));
        body.push_str(&pad(&self.country, 3));
        body.push_str(&pad(&self.illustrations, 4));
        body.push_str(&" ".repeat(6));
        body.push(self.modified_record);
        body.push('0');
        body.push('0');
        body.push(if self.has_index { '1' } else { '0' });
        body.push(self.cataloging_source);
        body.push(self.literary_form);
        body.push(self.biography);
        body.push_str(&pad(&self.language, 3));
        body.push_str("  ");
        body
    }
}

/// Descriptive text the content detectors run over
#[derive(Debug, Default, Clone, Copy)]
pub struct BookText<'a> {
    pub title: &'a str,
    pub category: &'a str,
    pub description: &'a str,
    pub toc: &'a str,
}

impl BookText<'_> {
    fn blob(&self) -> String {
        [self.title, self.description, self.toc].join(" ")
    }
}

/// First 19xx/20xx year in a publication date, or `19uu`
pub fn extract_year(pub_date: &str) -> String {
    YEAR.find(pub_date)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_DATE1.to_string())
}

pub fn detect_illustrations(text: &str) -> String {
    let mut out = String::new();
    for (re, code) in [(&*ILLUS_A, 'a'), (&*ILLUS_D, 'd'), (&*ILLUS_O, 'o')] {
        if re.is_match(text) && !out.contains(code) {
            out.push(code);
        }
    }
    out
}

pub fn detect_index(text: &str) -> bool {
    INDEX.is_match(text)
}

pub fn detect_literary_form(title: &str, category: &str, extra: &str) -> char {
    let blob = format!("{} {} {}", title, category, extra);
    let rules: [(&Regex, char); 5] = [
        (&*LIT_LETTERS, 'i'),
        (&*LIT_TRAVEL, 'm'),
        (&*LIT_POETRY, 'p'),
        (&*LIT_FICTION, 'f'),
        (&*LIT_ESSAY, 'e'),
    ];
    rules
        .iter()
        .find(|(re, _)| re.is_match(&blob))
        .map(|(_, code)| *code)
        .unwrap_or(' ')
}

pub fn detect_biography(text: &str) -> char {
    if BIO_AUTO.is_match(text) {
        'a'
    } else if BIO_FULL.is_match(text) {
        'b'
    } else if BIO_PARTIAL.is_match(text) {
        'd'
    } else {
        ' '
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_forty_chars() {
        let body = Fixed008::new("250101", "2024")
            .unwrap()
            .with_country("ulk")
            .with_language("eng")
            .render();
        assert_eq!(body.chars().count(), 40);
        assert_eq!(&body[0..6], "250101");
        assert_eq!(&body[6..7], "s");
        assert_eq!(&body[7..11], "2024");
        assert_eq!(&body[15..18], "ulk");
        assert_eq!(&body[29..33], "000a");
        assert_eq!(&body[35..38], "eng");
    }

    #[test]
    fn test_rejects_bad_dates() {
        assert!(Fixed008::new("2501", "2024").is_err());
        assert!(Fixed008::new("25010a", "2024").is_err());
        assert!(Fixed008::new("250101", "24").is_err());
        assert!(Fixed008::new("250101", "19uu").is_ok());
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2023-05-10"), "2023");
        assert_eq!(extract_year(""), "19uu");
        assert_eq!(extract_year("1899"), "19uu");
    }

    #[test]
    fn test_detectors() {
        assert_eq!(detect_illustrations("컬러 사진과 일러스트 수록"), "ao");
        assert_eq!(detect_illustrations("plain text"), "");
        // bare 표 also matches words such as 대표 and 표지
        assert_eq!(detect_illustrations("통계 도표 수록"), "d");
        assert_eq!(detect_illustrations("한국 대표 작가"), "d");
        assert_eq!(detect_illustrations("표지 디자인"), "d");
        assert!(detect_index("부록: 찾아보기"));
        assert_eq!(detect_literary_form("어느 시인의 편지", "", ""), 'i');
        assert_eq!(detect_literary_form("달", "국내도서>소설/시/희곡>한국소설", ""), 'f');
        assert_eq!(detect_biography("어느 과학자의 평전"), 'b');
        assert_eq!(detect_biography("자서전"), 'a');
        assert_eq!(detect_biography("회상의 기록"), 'd');
    }

    #[test]
    fn test_for_book_fills_content_codes() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let text = BookText {
            title: "우리 시대의 시집",
            category: "국내도서>소설/시/희곡",
            description: "색인 포함",
            toc: "",
        };
        let fixed = Fixed008::for_book(today, "2021-11-02", &text).unwrap();
        assert_eq!(fixed.date_entered, "250309");
        assert_eq!(fixed.date1, "2021");
        assert!(fixed.has_index);
        assert_eq!(fixed.literary_form, 'p');
    }
}
