//! 300 physical description from the Aladin product page

use once_cell::sync::Lazy;
use regex::Regex;

use crate::marc::record::{DataField, BLANK};

static PAGES_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(쪽|p)\s*$").expect("valid regex"));
static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));
static SIZE_MM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*[*x×X]\s*(\d+)").expect("valid regex"));

const ILLUSTRATION_GROUPS: &[(&str, &[&str])] = &[
    ("천연색삽화", &["삽화", "일러스트", "일러스트레이션", "illustration", "그림"]),
    ("삽화", &["흑백 삽화", "흑백 일러스트", "흑백 일러스트레이션", "흑백 그림"]),
    ("사진", &["사진", "포토", "photo", "화보"]),
    ("도표", &["도표", "차트", "그래프"]),
    ("지도", &["지도", "지도책"]),
];

/// Page count and size read from the product info box
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extent {
    pub pages: Option<u32>,
    /// Width and height in millimetres as printed
    pub size_mm: Option<(u32, u32)>,
}

impl Extent {
    pub fn parse<S: AsRef<str>>(items: &[S]) -> Self {
        let mut extent = Extent::default();
        for item in items.iter().map(|s| s.as_ref().trim()) {
            if PAGES_TAIL.is_match(item) {
                if let Some(n) = FIRST_NUMBER.find(item).and_then(|m| m.as_str().parse().ok()) {
                    extent.pages = Some(n);
                }
            } else if item.contains("mm") {
                if let Some(caps) = SIZE_MM.captures(item) {
                    if let (Ok(w), Ok(h)) = (caps[1].parse(), caps[2].parse()) {
                        extent.size_mm = Some((w, h));
                    }
                }
            }
        }
        extent
    }

    /// 300 $c; both dimensions for square, landscape or narrow books
    pub fn size_cm(&self) -> Option<String> {
        let (w, h) = self.size_mm?;
        let cm = mm_to_cm;
        if w == h || w > h || f64::from(w) < f64::from(h) / 2.0 {
            Some(format!("{}x{} cm", cm(w), cm(h)))
        } else {
            Some(format!("{} cm", cm(h)))
        }
    }
}

/// Nearest centimetre, ties to even (225 mm is 22 cm, 235 mm is 24 cm)
fn mm_to_cm(mm: u32) -> u32 {
    let (q, r) = (mm / 10, mm % 10);
    if r > 5 || (r == 5 && q % 2 == 1) {
        q + 1
    } else {
        q
    }
}

/// Illustration labels found in the text, sorted
pub fn illustration_labels(text: &str) -> Vec<&'static str> {
    let mut labels: Vec<&'static str> = ILLUSTRATION_GROUPS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(label, _)| *label)
        .collect();
    labels.sort_unstable();
    labels
}

/// Build 300. Without any extent data the whole field is `$a1책.`
pub fn build_300(extent: &Extent, labels: &[&str]) -> DataField {
    let field = DataField::new("300", BLANK, BLANK);
    let pages = extent.pages.map(|n| format!("{} p.", n));
    let size = extent.size_cm();

    if pages.is_none() && labels.is_empty() && size.is_none() {
        return field.with('a', "1책.");
    }

    let a = pages.unwrap_or_else(|| "1책".to_string());
    let mut field = field;
    match (labels.is_empty(), &size) {
        (true, None) => field.push('a', format!("{}.", a)),
        (true, Some(_)) => field.push('a', format!("{} ;", a)),
        (false, _) => {
            field.push('a', format!("{} :", a));
            let b = labels.join(", ");
            if size.is_some() {
                field.push('b', format!("{} ;", b));
            } else {
                field.push('b', format!("{}.", b));
            }
        }
    }
    if let Some(c) = size {
        field.push('c', format!("{}.", c));
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::record::Field;

    #[test]
    fn test_extent_parse() {
        let items = ["양장본", "492쪽", "152*225mm", "720g"];
        let extent = Extent::parse(&items);
        assert_eq!(extent.pages, Some(492));
        assert_eq!(extent.size_mm, Some((152, 225)));
        assert_eq!(extent.size_cm(), Some("22 cm".to_string()));
    }

    #[test]
    fn test_size_rules() {
        let square = Extent { pages: None, size_mm: Some((200, 200)) };
        assert_eq!(square.size_cm(), Some("20x20 cm".to_string()));
        let landscape = Extent { pages: None, size_mm: Some((297, 210)) };
        assert_eq!(landscape.size_cm(), Some("30x21 cm".to_string()));
        let narrow = Extent { pages: None, size_mm: Some((90, 200)) };
        assert_eq!(narrow.size_cm(), Some("9x20 cm".to_string()));
    }

    #[test]
    fn test_size_rounds_half_to_even() {
        assert_eq!(mm_to_cm(225), 22);
        assert_eq!(mm_to_cm(235), 24);
        assert_eq!(mm_to_cm(224), 22);
        assert_eq!(mm_to_cm(226), 23);
        assert_eq!(mm_to_cm(188), 19);
        let extent = Extent { pages: None, size_mm: Some((148, 215)) };
        assert_eq!(extent.size_cm(), Some("22 cm".to_string()));
    }

    #[test]
    fn test_illustration_labels() {
        assert_eq!(illustration_labels("컬러 사진과 지도 수록"), vec!["사진", "지도"]);
        assert_eq!(illustration_labels("흑백 삽화"), vec!["삽화", "천연색삽화"]);
        assert!(illustration_labels("텍스트만").is_empty());
    }

    #[test]
    fn test_build_300_lines() {
        let extent = Extent { pages: Some(492), size_mm: Some((152, 225)) };
        let line = Field::from(build_300(&extent, &["사진"])).to_mrk();
        assert_eq!(line, "=300  \\\\$a492 p. :$b사진 ;$c22 cm.");

        let line = Field::from(build_300(&extent, &[])).to_mrk();
        assert_eq!(line, "=300  \\\\$a492 p. ;$c22 cm.");

        let pages_only = Extent { pages: Some(80), size_mm: None };
        let line = Field::from(build_300(&pages_only, &[])).to_mrk();
        assert_eq!(line, "=300  \\\\$a80 p.");

        let line = Field::from(build_300(&Extent::default(), &[])).to_mrk();
        assert_eq!(line, "=300  \\\\$a1책.");
    }
}
