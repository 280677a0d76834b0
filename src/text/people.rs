//! Role tagging of author statements
//!
//! Aladin and NLK write responsibility statements in many shapes:
//! `홍길동 (지은이), 김철수 (옮긴이)`, `지은이: 홍길동; 옮긴이: 김철수`,
//! `홍길동 글·그림`, `Jane Doe 지음 김철수 옮김`. Everything here reduces them
//! to per-role name lists.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::aladin::AladinItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Author,
    Translator,
    Illustrator,
    Editor,
    Other,
}

const ROLE_ALIASES: &[(&str, Role)] = &[
    ("지은이", Role::Author),
    ("저자", Role::Author),
    ("글", Role::Author),
    ("글쓴이", Role::Author),
    ("집필", Role::Author),
    ("원작", Role::Author),
    ("지음", Role::Author),
    ("글작가", Role::Author),
    ("스토리", Role::Author),
    ("author", Role::Author),
    ("writer", Role::Author),
    ("story", Role::Author),
    ("옮긴이", Role::Translator),
    ("옮김", Role::Translator),
    ("역자", Role::Translator),
    ("역", Role::Translator),
    ("번역", Role::Translator),
    ("역주", Role::Translator),
    ("공역", Role::Translator),
    ("translator", Role::Translator),
    ("trans", Role::Translator),
    ("translated", Role::Translator),
    ("그림", Role::Illustrator),
    ("그린", Role::Illustrator),
    ("삽화", Role::Illustrator),
    ("일러스트", Role::Illustrator),
    ("만화", Role::Illustrator),
    ("illustrator", Role::Illustrator),
    ("illus.", Role::Illustrator),
    ("artist", Role::Illustrator),
    ("엮음", Role::Editor),
    ("엮은이", Role::Editor),
    ("편집", Role::Editor),
    ("편", Role::Editor),
    ("편저", Role::Editor),
    ("편집자", Role::Editor),
    ("editor", Role::Editor),
    ("ed.", Role::Editor),
];

/// Role words, longest alternatives first
const ROLE_WORDS: &str = "글작가|글쓴이|지은이|저자|집필|원작|엮은이|엮음|지음|스토리|옮긴이|옮김|역자|역주|공역|번역|일러스트|그림|그린|삽화|만화|편집자|편집|편저|illustrator|translator|translated|author|writer|story|trans|editor|artist|illus\\.|ed\\.|글|역|편";

static ROLE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\([^)]*\)|(?:{w})(?:\s*[·/・]\s*(?:{w}))*",
        w = ROLE_WORDS
    ))
    .expect("valid regex")
});

static ROLE_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[()\[\]{}\s]").expect("valid regex"));
static ROLE_PARTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[·/・]").expect("valid regex"));
static TAIL_ROLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]+)\)\s*$").expect("valid regex"));
static LEADING_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\([^)]*\)\s*").expect("valid regex"));
static NAME_SEPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?:,|·|/|・|&|\band\b|\b그리고\b|\b및\b)\s*").expect("valid regex")
});

// NLK AUTHOR statements
const NLK_AUTHOR_LABELS: &str = r"(?:지은이|저자|저|저술|집필|원작|원저|글|글쓴이|글작가|스토리|각색|만화|그림|그림작가|삽화|일러스트(?:레이터)?|그린|글\s*[·/,+]\s*그림|그림\s*[·/,+]\s*글|글\s*그림|글그림)";
const NLK_TRANS_LABELS: &str = r"(?:옮긴이|옮김|역자|역|번역자?|역해|역주|공역)";
const NLK_AUTHOR_TRAIL: &str = r"(?:글|지음|지은이|저자|저|저술|집필|원작|원저|그림|그림작가|삽화|일러스트(?:레이터)?|그린|스토리|각색|만화)";
const NLK_TRANS_TRAIL: &str = r"(?:옮김|번역|번역자|역자|역|역해|역주|공역)";

static NLK_PAREN_ROLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\(\s*({}|{})\s*\)",
        NLK_AUTHOR_LABELS, NLK_TRANS_LABELS
    ))
    .expect("valid regex")
});
static NLK_LABELED_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<label>{}|{})\s*:\s*(?P<names>.+)$",
        NLK_AUTHOR_LABELS, NLK_TRANS_LABELS
    ))
    .expect("valid regex")
});
static NLK_AUTHOR_LABEL_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)^{}", NLK_AUTHOR_LABELS)).expect("valid regex"));
static NLK_ROLE_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:{}|{}|{}|{})$",
        NLK_AUTHOR_LABELS, NLK_TRANS_LABELS, NLK_AUTHOR_TRAIL, NLK_TRANS_TRAIL
    ))
    .expect("valid regex")
});
static NLK_AUTHOR_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\s+{}$", NLK_AUTHOR_TRAIL)).expect("valid regex"));
static NLK_TRANS_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\s+{}$", NLK_TRANS_TRAIL)).expect("valid regex"));
static NLK_STRIP_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\s+(?:{}|{})\s*[)\].,;:]*$",
        NLK_AUTHOR_TRAIL, NLK_TRANS_TRAIL
    ))
    .expect("valid regex")
});
static NLK_SEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*[,/&·]\s*|\s+and\s+|\s+with\s+|\s*\|\s*").expect("valid regex"));
static GROUP_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*;\s*").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

static TRAILING_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(.*?\)\s*$").expect("valid regex"));
static ROLE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(?:지음|지은이|엮음|옮김|역|편|글|그림)\s*$").expect("valid regex"));
static ANY_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").expect("valid regex"));
static AUTHOR_SEPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/;·,]").expect("valid regex"));

/// Names grouped by responsibility
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct People {
    pub authors: Vec<String>,
    pub translators: Vec<String>,
    pub illustrators: Vec<String>,
    pub editors: Vec<String>,
    pub others: Vec<String>,
}

fn dedup_in_place(names: &mut Vec<String>) {
    let unique: IndexSet<String> = names.drain(..).collect();
    names.extend(unique);
}

impl People {
    pub fn list(&self, role: Role) -> &[String] {
        match role {
            Role::Author => &self.authors,
            Role::Translator => &self.translators,
            Role::Illustrator => &self.illustrators,
            Role::Editor => &self.editors,
            Role::Other => &self.others,
        }
    }

    fn list_mut(&mut self, role: Role) -> &mut Vec<String> {
        match role {
            Role::Author => &mut self.authors,
            Role::Translator => &mut self.translators,
            Role::Illustrator => &mut self.illustrators,
            Role::Editor => &mut self.editors,
            Role::Other => &mut self.others,
        }
    }

    pub fn add(&mut self, role: Role, name: impl Into<String>) {
        self.list_mut(role).push(name.into());
    }

    fn remove_first(&mut self, role: Role, name: &str) {
        let list = self.list_mut(role);
        if let Some(pos) = list.iter().position(|n| n == name) {
            list.remove(pos);
        }
    }

    pub fn dedup(&mut self) {
        for role in [
            Role::Author,
            Role::Translator,
            Role::Illustrator,
            Role::Editor,
            Role::Other,
        ] {
            dedup_in_place(self.list_mut(role));
        }
    }

    /// Fold illustrators into the author list
    pub fn merge_illustrators(&mut self) {
        let illustrators = self.illustrators.clone();
        self.authors.extend(illustrators);
        dedup_in_place(&mut self.authors);
    }

    /// True when nobody usable for a statement of responsibility was found
    pub fn lacks_statement(&self) -> bool {
        self.authors.is_empty() && self.translators.is_empty()
    }

    /// Authors followed by translators
    pub fn responsible(&self) -> impl Iterator<Item = (&str, Role)> {
        self.authors
            .iter()
            .map(|n| (n.as_str(), Role::Author))
            .chain(self.translators.iter().map(|n| (n.as_str(), Role::Translator)))
    }
}

fn alias_role(word: &str) -> Role {
    ROLE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == word)
        .map(|(_, role)| *role)
        .unwrap_or(Role::Other)
}

/// Map a role token (`(옮긴이)`, `글·그림`, `trans`) to a role.
pub fn normalize_role(token: &str) -> Role {
    let t = ROLE_STRIP.replace_all(&token.trim().to_lowercase(), "").to_string();
    if t.is_empty() {
        return Role::Other;
    }
    let cats: Vec<Role> = ROLE_PARTS
        .split(&t)
        .filter(|p| !p.is_empty())
        .map(alias_role)
        .collect();
    [Role::Translator, Role::Author, Role::Illustrator, Role::Editor]
        .into_iter()
        .find(|r| cats.contains(r))
        .unwrap_or(Role::Other)
}

/// Split `이름 (역할)` into the name and its role
pub fn strip_tail_role(name: &str) -> (String, Role) {
    let name = name.trim();
    match TAIL_ROLE.captures(name) {
        Some(caps) => {
            let start = caps.get(0).map_or(name.len(), |m| m.start());
            (name[..start].trim().to_string(), normalize_role(&caps[1]))
        }
        None => (name.to_string(), Role::Other),
    }
}

pub fn split_names(chunk: &str) -> Vec<String> {
    let chunk = LEADING_PAREN.replace(chunk.trim(), "");
    NAME_SEPS
        .split(&chunk)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_token_delimiter(c: char) -> bool {
    c.is_whitespace() || ",·/:;()・&".contains(c)
}

/// Split into alternating name chunks and role tokens. A bare role word only
/// counts when it stands alone, so 편혜영 or 역사 stay names.
fn role_tokens(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut last = 0;
    let mut pos = 0;
    while let Some(m) = ROLE_TOKEN.find_at(s, pos) {
        let standalone = m.as_str().starts_with('(')
            || (s[..m.start()].chars().next_back().map_or(true, is_token_delimiter)
                && s[m.end()..].chars().next().map_or(true, is_token_delimiter));
        if standalone {
            tokens.push(&s[last..m.start()]);
            tokens.push(m.as_str());
            last = m.end();
            pos = m.end();
        } else {
            pos = m.start() + s[m.start()..].chars().next().map_or(1, char::len_utf8);
        }
        if pos >= s.len() {
            break;
        }
    }
    tokens.push(&s[last..]);
    tokens
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse a free-form responsibility statement.
///
/// Names seen before any role wait for the next role token; a role token that
/// directly follows names already filed under a role moves them to the new role.
pub fn parse_people(author_str: &str) -> People {
    let mut out = People::default();
    if author_str.trim().is_empty() {
        return out;
    }

    let mut current = Role::Other;
    let mut pending: Vec<String> = Vec::new();
    let mut last_names: Vec<String> = Vec::new();
    let mut last_assigned_to: Option<Role> = None;

    for tok in role_tokens(author_str) {
        let role = normalize_role(tok);
        if role != Role::Other {
            if !pending.is_empty() {
                for name in pending.drain(..) {
                    out.add(role, name);
                }
                last_names.clear();
                last_assigned_to = None;
            } else if let Some(prev) = last_assigned_to.take() {
                for name in last_names.drain(..) {
                    out.remove_first(prev, &name);
                    out.add(role, name);
                }
            }
            current = role;
            continue;
        }

        let names = split_names(tok);
        if names.is_empty() {
            continue;
        }

        let mut direct = Vec::new();
        for raw in &names {
            let (base, tail) = strip_tail_role(raw);
            if tail != Role::Other {
                out.add(tail, base.clone());
                direct.push(base);
            }
        }
        let remain: Vec<String> = names
            .into_iter()
            .filter(|n| !direct.contains(n) && strip_tail_role(n).1 == Role::Other)
            .collect();
        if remain.is_empty() {
            last_names = direct;
            last_assigned_to = None;
            continue;
        }

        if current != Role::Other {
            for name in &remain {
                out.add(current, name.clone());
            }
            last_names = remain;
            last_assigned_to = Some(current);
        } else {
            pending.extend(remain.iter().cloned());
            last_names = remain;
            last_assigned_to = None;
        }
    }

    for name in pending {
        out.add(Role::Author, name);
    }
    out.dedup();
    out
}

/// People of an Aladin item, from `subInfo.authors` when present
pub fn people_from_aladin(item: &AladinItem, merge_illustrators: bool) -> People {
    let mut people = if item.sub_info.authors.is_empty() {
        parse_people(&item.author)
    } else {
        let mut people = People::default();
        for entry in &item.sub_info.authors {
            let name = entry.author_name.trim();
            if name.is_empty() {
                continue;
            }
            let (base, tail) = strip_tail_role(name);
            let role = if tail != Role::Other {
                tail
            } else {
                normalize_role(entry.role_label())
            };
            people.add(role, base);
        }
        people.dedup();
        people
    };
    if merge_illustrators {
        people.merge_illustrators();
    }
    people
}

/// Authors and translators of an NLK Seoji AUTHOR string
pub fn split_authors_translators(raw: &str) -> (Vec<String>, Vec<String>) {
    let mut authors = Vec::new();
    let mut translators = Vec::new();
    if raw.trim().is_empty() {
        return (authors, translators);
    }

    let s = WHITESPACE.replace_all(raw.trim(), " ");
    let s = NLK_PAREN_ROLE.replace_all(&s, " ${1}");

    for group in GROUP_SEP.split(&s).map(str::trim).filter(|g| !g.is_empty()) {
        if let Some(caps) = NLK_LABELED_GROUP.captures(group) {
            let target = if NLK_AUTHOR_LABEL_START.is_match(&caps["label"]) {
                &mut authors
            } else {
                &mut translators
            };
            target.extend(
                NLK_SEP
                    .split(&caps["names"])
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            );
            continue;
        }

        for chunk in NLK_SEP.split(group).map(str::trim).filter(|c| !c.is_empty()) {
            if NLK_ROLE_ONLY.is_match(chunk) {
                continue;
            }
            let is_author = NLK_AUTHOR_TAIL.is_match(chunk);
            let is_trans = NLK_TRANS_TAIL.is_match(chunk);
            let base = NLK_STRIP_TAIL.replace(chunk, "").trim().to_string();
            if base.is_empty() {
                continue;
            }
            if is_trans && !is_author {
                translators.push(base);
            } else {
                authors.push(base);
            }
        }
    }

    dedup_in_place(&mut authors);
    dedup_in_place(&mut translators);
    (authors, translators)
}

fn strip_role_suffix(s: &str) -> String {
    ROLE_SUFFIX.replace(s.trim(), "").trim().to_string()
}

/// First author's name as Aladin writes it
pub fn primary_author(item: &AladinItem) -> String {
    let authors = &item.sub_info.authors;
    if !authors.is_empty() {
        let main = authors
            .iter()
            .filter(|a| !a.author_name.trim().is_empty())
            .find(|a| {
                let label = a.role_label();
                label.contains("지은이") || label.contains("저자")
            })
            .or_else(|| authors.first());
        return main
            .map(|a| strip_role_suffix(&a.author_name))
            .unwrap_or_default();
    }

    let first_seg = item.author.split(',').next().unwrap_or("");
    let first = TRAILING_PAREN.replace(first_seg, "");
    strip_role_suffix(&first)
}

/// Author string reduced to bare names separated by spaces
pub fn clean_author_string(s: &str) -> String {
    let s = ANY_PAREN.replace_all(s, " ");
    let s = AUTHOR_SEPS.replace_all(&s, " ");
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}
