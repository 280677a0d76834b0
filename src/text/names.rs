//! Personal name order for 700 headings

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::script::has_hangul;

/// Countries whose names are written family name first
pub const EAST_ASIAN_P27: &[&str] = &["Q17", "Q148", "Q884", "Q423", "Q865", "Q864", "Q14773"];

pub const NAME_ORDER_SYSTEM_PROMPT: &str = "\
당신은 한국 도서관 KORMARC 700 필드용 이름 정렬 보조자입니다.
입력은 '한글 표기' 저자명과 알라딘/위키데이터 메타 컨텍스트입니다.
임무: 이름의 성·이름 순서를 판별하고, 필요 시 '성, 이름'으로 재배열하여 결과를 JSON으로만 응답합니다.

[판별 우선순위]
1) 한글 표기 이름이 성–이름 관습인 언어권(한국/중국/일본 등)으로 명백하면 KEEP.
2) 그 외에는 originalTitle/categoryName 등을 근거로 일반적 관습을 추정:
   - 다수 유럽/미주권: 기본 이름–성 → '성, 이름'으로 REORDER.
   - 러시아/동유럽권: 이름–성 제공이 흔함 → REORDER.
3) 단일 이름(모노님)은 KEEP.

[예외/세부 규칙]
- 스페인/포르투갈 복성(de, da, del, de la, dos, y 등)은 성으로 유지(예: '가르시아 마르케스, 가브리엘').
- 네덜란드 접두사(van, van der, de 등)는 성의 일부로 처리(예: '반 고흐, 빈센트').
- 하이픈 성/이름은 통째로 유지(예: '장-폴').
- 러시아식 부칭은 이름 뒤에 두고, 성을 앞으로(예: '도스토옙스키, 표도르').
- 베트남식은 통상 성–이름이므로 KEEP.
- 인물이 단체/기관으로 보이면 KEEP.

[출력 형식]
JSON 한 줄만:
{\"action\":\"KEEP|REORDER\",\"result\":\"<최종 표기>\",\"reason\":\"<근거>\",\"confidence\":0.0~1.0}
REORDER 시 result는 반드시 '성, 이름'이어야 함.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum NameAction {
    Reorder,
    Keep,
}

/// Answer of the name-order model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NameOrderDecision {
    pub action: NameAction,
    pub result: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.75
}

impl NameOrderDecision {
    pub fn keep(name: &str, reason: &str, confidence: f64) -> Self {
        Self {
            action: NameAction::Keep,
            result: name.to_string(),
            reason: reason.to_string(),
            confidence,
        }
    }

    /// Repair a REORDER whose result lacks the comma
    pub fn corrected(mut self, name: &str) -> Self {
        if self.result.trim().is_empty() {
            self.result = name.to_string();
        }
        if self.action == NameAction::Reorder && !self.result.contains(',') {
            if let Some(swapped) = swap_hangul_pair(name) {
                self.result = swapped;
            }
        }
        self.result = self.result.trim().to_string();
        self
    }
}

pub fn is_mononym(name: &str) -> bool {
    name.split_whitespace().count() <= 1
}

fn swap_hangul_pair(name: &str) -> Option<String> {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [first, last] if has_hangul(name) => Some(format!("{}, {}", last, first)),
        _ => None,
    }
}

/// Decision used when no model is available or the call failed
pub fn fallback_order(name: &str, reason: &str) -> NameOrderDecision {
    let name = name.trim();
    if is_mononym(name) {
        return NameOrderDecision::keep(name, "mononym", 0.9);
    }
    match swap_hangul_pair(name) {
        Some(result) => NameOrderDecision {
            action: NameAction::Reorder,
            result,
            reason: reason.to_string(),
            confidence: 0.4,
        },
        None => NameOrderDecision::keep(name, reason, 0.4),
    }
}

pub fn name_order_cache_key(name: &str, context: &str) -> String {
    format!("name-order|{}|{}", name.trim(), context)
}

/// `A B` becomes `B, A`; anything else is returned unchanged
pub fn simple_reorder_family_given(label: &str) -> String {
    let parts: Vec<&str> = label.split_whitespace().collect();
    match parts.as_slice() {
        [a, b] => format!("{}, {}", b, a),
        _ => label.to_string(),
    }
}

/// Search spellings of a Korean-transcribed name
pub fn ko_name_variants(name: &str) -> Vec<String> {
    let name = name.trim();
    if name.is_empty() {
        return Vec::new();
    }
    let mut out: IndexSet<String> = IndexSet::new();
    out.insert(name.to_string());
    if let Some((family, given)) = name.split_once(',') {
        let (family, given) = (family.trim(), given.trim());
        if !family.is_empty() && !given.is_empty() && !given.contains(',') {
            out.insert(format!("{} {}", given, family));
        }
    }
    let seeds: Vec<String> = out.iter().cloned().collect();
    for s in &seeds {
        out.insert(s.replace('옙', "예"));
        out.insert(s.replace("예프", "옙"));
    }
    let seeds: Vec<String> = out.iter().cloned().collect();
    for s in &seeds {
        out.insert(s.replace(' ', ""));
    }
    out.into_iter().take(8).collect()
}

pub fn is_east_asian_country(qid: &str) -> bool {
    EAST_ASIAN_P27.contains(&qid)
}
