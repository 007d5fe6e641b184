//! Word tables shared by the hash embedder and the content analyzer

/// Stress and emotional-strain stems
pub const STRESS: &[&str] = &["stress", "anxi", "worr", "overwhelm", "pressure", "burnout", "upset"];

/// Money trouble stems
pub const FINANCIAL: &[&str] = &[
    "financ", "money", "tax", "debt", "mortgage", "property", "bills", "income", "salary", "rent",
    "afford",
];

pub const EMPLOYMENT: &[&str] = &[
    "job", "employ", "career", "hire", "hiring", "fired", "contract", "workplace", "work",
];

pub const GRIEVANCE: &[&str] = &["grievance", "complain", "dispute", "appeal", "disciplin", "misconduct"];

pub const POLICY: &[&str] = &[
    "policy", "policies", "procedure", "guideline", "rule", "regulation", "complian",
];

pub const SUPERVISION: &[&str] = &["supervis", "session", "feedback", "mentor", "coaching"];

pub const FAMILY: &[&str] = &["family", "child", "parent", "wife", "husband", "partner", "daughter", "son"];

pub const HEALTH: &[&str] = &["health", "sick", "ill", "leave", "wellbeing", "medical", "therapy"];

pub const COMPARISON: &[&str] = &["compar", "differ", "versus", "vs", "contrast", "align", "consistent"];

/// Whether a lowercased word matches a stem.
///
/// Stems shorter than four bytes only match the whole word or its plural, so
/// "son" does not match "sonnet".
pub fn stem_matches(word: &str, stem: &str) -> bool {
    if stem.len() < 4 {
        word.strip_prefix(stem)
            .is_some_and(|rest| matches!(rest, "" | "s" | "es"))
    } else {
        word.starts_with(stem)
    }
}

/// Whether a lowercased word matches any stem of `group`
pub fn in_group(word: &str, group: &[&str]) -> bool {
    group.iter().any(|stem| stem_matches(word, stem))
}

/// Drop an English possessive suffix: "nathan's" becomes "nathan"
pub fn strip_possessive(word: &str) -> &str {
    ["'s", "'S", "\u{2019}s", "\u{2019}S"]
        .iter()
        .find_map(|suffix| word.strip_suffix(*suffix))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(word)
}
