//! Publisher name matching and place-of-publication display

use once_cell::sync::Lazy;
use regex::Regex;

pub const UNKNOWN_PLACE: &str = "출판지 미상";
pub const UNKNOWN_COUNTRY: &str = "xxu";

const MAJOR_CITIES: &[&str] = &["서울", "인천", "대전", "광주", "울산", "대구", "부산", "세종"];
const PLACE_SENTINELS: &[&str] = &[UNKNOWN_PLACE, "[예외] 발행지미상", "[발행지미상]"];

static NAME_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s|\(.*?\)|주식회사|㈜|도서출판|출판사").expect("valid regex"));
static IMPRINT_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)주니어|JUNIOR|어린이|키즈|북스|아이세움|프레스").expect("valid regex"));
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((.*?)\)").expect("valid regex"));
static ALIAS_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,/]").expect("valid regex"));

const LATIN_TO_HANGUL: &[(&str, &str)] = &[
    ("springer", "스프링거"),
    ("cambridge", "케임브리지"),
    ("oxford", "옥스포드"),
];

/// Key for exact publisher matching
pub fn normalize_publisher_name(name: &str) -> String {
    NAME_NOISE.replace_all(name, "").to_lowercase()
}

/// Looser key: imprint words dropped, a few Latin names transcribed
pub fn normalize_stage2(name: &str) -> String {
    let mut s = IMPRINT_NOISE.replace_all(name, "").to_lowercase();
    for (latin, hangul) in LATIN_TO_HANGUL {
        s = s.replace(latin, hangul);
    }
    s.trim().to_string()
}

/// Representative name and aliases of `대표명/별칭 (별칭, 별칭)`
pub fn split_publisher_aliases(name: &str) -> (String, Vec<String>) {
    let mut aliases: Vec<String> = BRACKETED
        .captures_iter(name)
        .flat_map(|caps| {
            ALIAS_SEP
                .split(&caps[1])
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();

    let outside = BRACKETED.replace_all(name, "");
    let outside = outside.trim();
    let mut parts = outside.split('/').map(str::trim).filter(|p| !p.is_empty());
    let rep = parts.next().unwrap_or(outside).to_string();
    aliases.extend(parts.map(str::to_string));
    (rep, aliases)
}

pub fn is_unknown_place(place: &str) -> bool {
    let p = place.trim();
    p.is_empty() || PLACE_SENTINELS.contains(&p) || p.contains("발행지미상")
}

/// 260 $a form of an address: the city, or the second word of a provincial address
pub fn display_place(address: &str) -> String {
    let address = address.trim();
    if is_unknown_place(address) {
        return address.to_string();
    }
    if MAJOR_CITIES.iter().any(|c| address.contains(c)) {
        return address.chars().take(2).collect();
    }
    let words: Vec<&str> = address.split_whitespace().collect();
    let loc = words.get(1).or_else(|| words.first()).copied().unwrap_or("");
    loc.strip_suffix('시')
        .or_else(|| loc.strip_suffix('군'))
        .unwrap_or(loc)
        .to_string()
}

/// 전라북도 → 전북, 경기도 → 경기
pub fn normalize_region_for_code(region: &str) -> String {
    let region = region.trim();
    if ["전라", "충청", "경상"].iter().any(|p| region.starts_with(p)) {
        let chars: Vec<char> = region.chars().collect();
        let mut out = String::new();
        out.push(chars[0]);
        if let Some(c) = chars.get(2) {
            out.push(*c);
        }
        return out;
    }
    region.chars().take(2).collect()
}

/// 008 country code of a place; regions are `(name, code)` pairs
pub fn country_code_for_place<'a, I>(place: &str, regions: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    if is_unknown_place(place) {
        return UNKNOWN_COUNTRY.to_string();
    }
    let wanted = normalize_region_for_code(place);
    regions
        .into_iter()
        .find(|(name, _)| normalize_region_for_code(name) == wanted)
        .map(|(_, code)| code.trim())
        .filter(|code| !code.is_empty())
        .unwrap_or(UNKNOWN_COUNTRY)
        .to_string()
}
