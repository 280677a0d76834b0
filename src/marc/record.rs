//! MARC field model in MRK (MarcEdit text) form
//!
//! A record is an ordered list of fields. Each field renders to one MRK line:
//! `=245  00$aTitle :$bSubtitle`, with blank indicators written as `\`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Blank indicator
pub const BLANK: char = ' ';

const MRK_BLANK: char = '\\';
const DOLLAR_ESCAPE: &str = "{dollar}";

/// A MARC data field (010-999)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    /// Field tag (3 characters)
    pub tag: String,
    /// First indicator
    pub ind1: char,
    /// Second indicator
    pub ind2: char,
    /// Subfields
    pub subfields: Vec<Subfield>,
}

/// A MARC subfield
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield data, including any ISBD punctuation that precedes the next subfield
    pub data: String,
}

/// A control field (00X) or a data field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Control { tag: String, data: String },
    Data(DataField),
}

/// An ordered collection of fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarcRecord {
    pub fields: Vec<Field>,
}

fn is_control_tag(tag: &str) -> bool {
    tag.starts_with("00") || tag == "LDR"
}

fn render_indicator(c: char) -> char {
    if c == BLANK {
        MRK_BLANK
    } else {
        c
    }
}

fn parse_indicator(c: char) -> char {
    if c == MRK_BLANK {
        BLANK
    } else {
        c
    }
}

/// Numeric sort key; `LDR` and other non-numeric tags sort first.
fn tag_order(tag: &str) -> u32 {
    tag.parse::<u32>().map(|n| n + 1).unwrap_or(0)
}

impl DataField {
    pub fn new(tag: &str, ind1: char, ind2: char) -> Self {
        Self {
            tag: tag.to_string(),
            ind1,
            ind2,
            subfields: Vec::new(),
        }
    }

    /// Builder-style subfield append
    pub fn with(mut self, code: char, data: impl Into<String>) -> Self {
        self.push(code, data);
        self
    }

    pub fn push(&mut self, code: char, data: impl Into<String>) {
        self.subfields.push(Subfield {
            code,
            data: data.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.subfields.iter().all(|s| s.data.trim().is_empty())
    }

    /// Get the first subfield value for a code
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|s| s.code == code)
            .map(|s| s.data.as_str())
    }

    /// Get all subfield values for a code
    pub fn get_all_subfields(&self, code: char) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|s| s.code == code)
            .map(|s| s.data.as_str())
            .collect()
    }
}

impl Field {
    pub fn control(tag: &str, data: impl Into<String>) -> Self {
        Field::Control {
            tag: tag.to_string(),
            data: data.into(),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Field::Control { tag, .. } => tag,
            Field::Data(df) => &df.tag,
        }
    }

    pub fn as_data(&self) -> Option<&DataField> {
        match self {
            Field::Data(df) => Some(df),
            Field::Control { .. } => None,
        }
    }

    pub fn to_mrk(&self) -> String {
        self.to_string()
    }

    /// Parse one MRK line (`=TAG  ...`). Returns None for anything else.
    pub fn parse_mrk(line: &str) -> Option<Field> {
        let line = line.trim_end_matches(['\r', '\n']);
        let rest = line.strip_prefix('=')?;
        let tag: String = rest.chars().take(3).collect();
        if tag.chars().count() != 3 {
            return None;
        }
        let body = rest[tag.len()..].strip_prefix("  ")?;

        if is_control_tag(&tag) {
            return Some(Field::control(&tag, body));
        }

        let mut chars = body.chars();
        let ind1 = parse_indicator(chars.next()?);
        let ind2 = parse_indicator(chars.next()?);
        let subfield_part = chars.as_str();

        let mut field = DataField::new(&tag, ind1, ind2);
        for part in subfield_part.split('$').skip(1) {
            let mut part_chars = part.chars();
            let Some(code) = part_chars.next() else {
                continue;
            };
            field.push(code, part_chars.as_str().replace(DOLLAR_ESCAPE, "$"));
        }
        Some(Field::Data(field))
    }
}

impl From<DataField> for Field {
    fn from(df: DataField) -> Self {
        Field::Data(df)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Control { tag, data } => write!(f, "={}  {}", tag, data),
            Field::Data(df) => {
                write!(
                    f,
                    "={}  {}{}",
                    df.tag,
                    render_indicator(df.ind1),
                    render_indicator(df.ind2)
                )?;
                for sf in &df.subfields {
                    write!(f, "${}{}", sf.code, sf.data.replace('$', DOLLAR_ESCAPE))?;
                }
                Ok(())
            }
        }
    }
}

impl MarcRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<Field>) {
        self.fields.push(field.into());
    }

    /// Parse MRK text, skipping lines that are not fields
    pub fn parse_mrk(text: &str) -> Self {
        Self {
            fields: text.lines().filter_map(Field::parse_mrk).collect(),
        }
    }

    /// Get a subfield value by tag and subfield code
    pub fn get_subfield(&self, tag: &str, code: char) -> Option<&str> {
        self.data_fields(tag)
            .into_iter()
            .find_map(|df| df.get_subfield(code))
    }

    /// Get all subfield values for a tag and code
    pub fn get_all_subfields(&self, tag: &str, code: char) -> Vec<&str> {
        self.data_fields(tag)
            .into_iter()
            .flat_map(|df| df.get_all_subfields(code))
            .collect()
    }

    /// Get a control field value
    pub fn control_field(&self, tag: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            Field::Control { tag: t, data } if t == tag => Some(data.as_str()),
            _ => None,
        })
    }

    /// Get all fields with a specific tag
    pub fn fields(&self, tag: &str) -> Vec<&Field> {
        self.fields.iter().filter(|f| f.tag() == tag).collect()
    }

    /// Get all data fields with a specific tag
    pub fn data_fields(&self, tag: &str) -> Vec<&DataField> {
        self.fields
            .iter()
            .filter_map(Field::as_data)
            .filter(|df| df.tag == tag)
            .collect()
    }

    /// Stable sort by numeric tag; fields sharing a tag keep their order
    pub fn sort_by_tag(&mut self) {
        self.fields.sort_by_key(|f| tag_order(f.tag()));
    }

    pub fn lines(&self) -> Vec<String> {
        self.fields.iter().map(Field::to_mrk).collect()
    }

    pub fn to_mrk(&self) -> String {
        self.lines().join("\n")
    }
}
