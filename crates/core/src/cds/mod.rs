//! Clinical decision support engines.
//!
//! Every engine here is a pure function over already-fetched data: no I/O,
//! no clock reads (evaluation dates are passed in), and output that does not
//! depend on input order.

pub mod care_gaps;
pub mod fall;
pub mod interactions;
pub mod readmission;
pub mod sepsis;
pub mod vitals;

use serde::{Deserialize, Serialize};

/// Risk tier shared by the scoring engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

/// One scored item of a composite score, for display next to the total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreItem {
    pub name: String,
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ScoreItem {
    pub fn new(name: &str, points: u32, detail: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            points,
            detail,
        }
    }
}

/// Whether lowercase `text` mentions `term` as whole words
/// (`"fallopian"` does not mention `"fall"`).
pub(crate) fn mentions(text: &str, term: &str) -> bool {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric());
    let mut start = 0;
    while let Some(pos) = text[start..].find(term) {
        let at = start + pos;
        let end = at + term.len();
        let before = text[..at].chars().next_back();
        let after = text[end..].chars().next();
        if !is_word(before) && !is_word(after) {
            return true;
        }
        start = at + term.len().max(1);
        if start >= text.len() {
            break;
        }
    }
    false
}

/// Normalise a code for prefix matching: uppercase, no dots
pub(crate) fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| *c != '.')
        .flat_map(|c| c.to_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_respects_word_boundaries() {
        assert!(mentions("history of fall at home", "fall"));
        assert!(mentions("fall", "fall"));
        assert!(!mentions("fallopian tube disorder", "fall"));
        assert!(!mentions("nightfall", "fall"));
        assert!(mentions("type 2 diabetes mellitus", "diabetes"));
        assert!(mentions("congestive heart failure, chronic", "heart failure"));
    }

    #[test]
    fn normalizes_icd_codes() {
        assert_eq!(normalize_code("i25.2"), "I252");
        assert_eq!(normalize_code("E11.65"), "E1165");
    }

    #[test]
    fn tiers_order_by_severity() {
        assert!(RiskTier::High > RiskTier::Moderate);
        assert!(RiskTier::Moderate > RiskTier::Low);
    }
}
