//! KORMARC field builders
//!
//! Each builder returns a field ready for the record, with the ISBD
//! punctuation carried at the end of the preceding subfield. Builders for
//! optional fields return `None` when there is nothing to say.

use once_cell::sync::Lazy;
use regex::Regex;

use super::record::{DataField, Field, BLANK};
use crate::text::script::{language_name, UNDETERMINED};
use crate::text::title::TitleStatement;

pub const UNKNOWN_PUBLISHER: &str = "발행자 미상";
pub const UNKNOWN_YEAR: &str = "발행년 미상";
pub const UNKNOWN_PLACE_260: &str = "발행지 미상";

static KDC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}(?:\.\d+)?$").expect("valid regex"));

/// Append punctuation to the last subfield
fn punctuate(field: &mut DataField, punct: &str) {
    if let Some(last) = field.subfields.last_mut() {
        last.data.push_str(punct);
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

pub fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Printed book
pub fn build_007() -> Field {
    Field::control("007", "ta")
}

pub fn build_008(body: String) -> Field {
    Field::control("008", body)
}

pub fn build_020(isbn: &str, add_code: Option<&str>, price: Option<&str>) -> DataField {
    let mut field = DataField::new("020", BLANK, BLANK).with('a', isbn);
    if let Some(code) = non_empty(add_code) {
        field.push('g', code);
    }
    if let Some(price) = non_empty(price) {
        punctuate(&mut field, ":");
        field.push('c', price);
    }
    field
}

/// 041 with `$h` only when the original language is known and differs
pub fn build_041(a: &str, h: Option<&str>) -> DataField {
    let h = h.filter(|h| *h != UNDETERMINED && *h != a);
    let ind1 = if h.is_some() { '1' } else { '0' };
    let mut field = DataField::new("041", ind1, BLANK).with('a', a);
    if let Some(h) = h {
        field.push('h', h);
    }
    field
}

/// 546 note text for the codes of 041
pub fn language_note(a_codes: &[&str], h: Option<&str>) -> String {
    match a_codes {
        [] => "언어 정보 없음".to_string(),
        [a] => match h {
            Some(h) => format!("{}원작을 {}로 번역", language_name(h), language_name(a)),
            None => format!("{}로 씀", language_name(a)),
        },
        many => {
            let names: Vec<&str> = many.iter().map(|c| language_name(c)).collect();
            format!("{} 병기", names.join("、"))
        }
    }
}

/// 546 derived from a built 041
pub fn build_546(field_041: &DataField) -> DataField {
    let a_codes = field_041.get_all_subfields('a');
    let note = language_note(&a_codes, field_041.get_subfield('h'));
    DataField::new("546", BLANK, BLANK).with('a', note)
}

/// Holdings; only when a registration mark or number is given
pub fn build_049(reg_mark: &str, reg_no: &str, copy_symbol: &str) -> Option<DataField> {
    let (reg_mark, reg_no, copy_symbol) = (reg_mark.trim(), reg_no.trim(), copy_symbol.trim());
    if reg_mark.is_empty() && reg_no.is_empty() {
        return None;
    }
    let mut field = DataField::new("049", BLANK, BLANK).with('I', format!("{}{}", reg_mark, reg_no));
    if !copy_symbol.is_empty() {
        field.push('f', copy_symbol);
    }
    Some(field)
}

pub fn is_valid_kdc(kdc: &str) -> bool {
    KDC.is_match(kdc) && kdc != "000"
}

pub fn build_056(kdc: &str, edition: &str) -> Option<DataField> {
    let kdc = kdc.trim();
    is_valid_kdc(kdc).then(|| {
        DataField::new("056", BLANK, BLANK)
            .with('a', kdc)
            .with('2', edition)
    })
}

/// 245 with the statement of responsibility
pub fn build_245(title: &TitleStatement, authors: &[String], translators: &[String]) -> DataField {
    let mut field = DataField::new("245", '0', '0').with('a', title.a.as_str());
    if let Some(n) = &title.n {
        punctuate(&mut field, if title.a.ends_with('.') { " " } else { " ." });
        field.push('n', n.as_str());
    }
    if let Some(b) = &title.b {
        punctuate(&mut field, " :");
        field.push('b', b.as_str());
    }
    if let Some((head, rest)) = authors.split_first() {
        punctuate(&mut field, " /");
        field.push('d', head.as_str());
        for other in rest {
            punctuate(&mut field, ", ");
            field.push('e', other.as_str());
        }
        punctuate(&mut field, " 지음");
    }
    if let Some((head, rest)) = translators.split_first() {
        punctuate(&mut field, " ;");
        field.push('e', head.as_str());
        for other in rest {
            punctuate(&mut field, ", ");
            field.push('e', other.as_str());
        }
        punctuate(&mut field, " 옮김");
    }
    field
}

pub fn build_246(original_title: &str) -> Option<DataField> {
    let orig = original_title.trim();
    (!orig.is_empty()).then(|| DataField::new("246", '1', '9').with('a', orig))
}

pub fn build_260(place: &str, publisher: &str, year: &str) -> DataField {
    let or = |s: &str, default: &str| {
        let s = s.trim();
        if s.is_empty() {
            default.to_string()
        } else {
            s.to_string()
        }
    };
    DataField::new("260", BLANK, BLANK)
        .with('a', format!("{} :", or(place, UNKNOWN_PLACE_260)))
        .with('b', format!("{},", or(publisher, UNKNOWN_PUBLISHER)))
        .with('c', format!("{}.", or(year, UNKNOWN_YEAR)))
}

/// 490 and 830 for a series, with the volume when known
pub fn build_series(series: &str, volume: Option<&str>) -> Option<(DataField, DataField)> {
    let series = series.trim();
    if series.is_empty() {
        return None;
    }
    let volume = non_empty(volume);
    let make = |tag: &str, ind1: char, ind2: char| {
        let mut field = DataField::new(tag, ind1, ind2).with('a', series);
        if let Some(v) = volume {
            punctuate(&mut field, " ;");
            field.push('v', v);
        }
        field
    };
    Some((make("490", '1', '0'), make("830", BLANK, '0')))
}

pub fn build_653(keywords: &[String]) -> Option<DataField> {
    if keywords.is_empty() {
        return None;
    }
    let mut field = DataField::new("653", BLANK, BLANK);
    for kw in keywords {
        field.push('a', kw.as_str());
    }
    Some(field)
}

pub fn build_700(name: &str) -> DataField {
    DataField::new("700", '1', BLANK).with('a', name)
}

/// Original-script name of a contributor
pub fn build_900(value: &str) -> DataField {
    DataField::new("900", '1', '0').with('a', value)
}

pub fn build_940(reading: &str) -> DataField {
    DataField::new("940", BLANK, BLANK).with('a', reading)
}

pub fn build_950(price: &str) -> Option<DataField> {
    let digits = digits_only(price);
    (!digits.is_empty()).then(|| DataField::new("950", '0', BLANK).with('b', digits))
}
