//! Morse Fall Scale.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{RiskTier, ScoreItem, mentions, normalize_code};
use crate::extract::{codings, concept_text, condition_terms, is_active_condition, is_active_medication};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbulatoryAid {
    #[default]
    None,
    BedRest,
    NurseAssist,
    CrutchesCaneWalker,
    Furniture,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gait {
    #[default]
    Normal,
    BedRest,
    Wheelchair,
    Weak,
    Impaired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MentalStatus {
    #[default]
    Oriented,
    ForgetsLimitations,
}

/// Nursing assessment items of the Morse Fall Scale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MorseInput {
    pub history_of_falling: bool,
    pub secondary_diagnosis: bool,
    pub ambulatory_aid: AmbulatoryAid,
    pub iv_therapy: bool,
    pub gait: Gait,
    pub mental_status: MentalStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallRiskResult {
    /// 0 to 125
    pub score: u32,
    pub tier: RiskTier,
    pub items: Vec<ScoreItem>,
}

/// Score the Morse Fall Scale. Under 25 is low risk, 25 to 44 moderate,
/// 45 and above high.
pub fn morse_fall_scale(input: &MorseInput) -> FallRiskResult {
    let items = vec![
        ScoreItem::new(
            "historyOfFalling",
            if input.history_of_falling { 25 } else { 0 },
            None,
        ),
        ScoreItem::new(
            "secondaryDiagnosis",
            if input.secondary_diagnosis { 15 } else { 0 },
            None,
        ),
        ScoreItem::new(
            "ambulatoryAid",
            match input.ambulatory_aid {
                AmbulatoryAid::None | AmbulatoryAid::BedRest | AmbulatoryAid::NurseAssist => 0,
                AmbulatoryAid::CrutchesCaneWalker => 15,
                AmbulatoryAid::Furniture => 30,
            },
            None,
        ),
        ScoreItem::new("ivTherapy", if input.iv_therapy { 20 } else { 0 }, None),
        ScoreItem::new(
            "gait",
            match input.gait {
                Gait::Normal | Gait::BedRest | Gait::Wheelchair => 0,
                Gait::Weak => 10,
                Gait::Impaired => 20,
            },
            None,
        ),
        ScoreItem::new(
            "mentalStatus",
            match input.mental_status {
                MentalStatus::Oriented => 0,
                MentalStatus::ForgetsLimitations => 15,
            },
            None,
        ),
    ];

    let score = items.iter().map(|i| i.points).sum();
    let tier = match score {
        0..=24 => RiskTier::Low,
        25..=44 => RiskTier::Moderate,
        _ => RiskTier::High,
    };

    FallRiskResult { score, tier, items }
}

/// ICD-10 falls (W00-W19) and history of falling (Z91.81)
const FALL_ICD_PREFIXES: &[&str] = &[
    "W00", "W01", "W02", "W03", "W04", "W05", "W06", "W07", "W08", "W09", "W10", "W11", "W12",
    "W13", "W14", "W15", "W16", "W17", "W18", "W19", "Z9181",
];

/// SNOMED CT: fall, history of fall
const FALL_SNOMED: &[&str] = &["1912002", "161898004"];

const IV_ROUTE_CODES: &[&str] = &["47625008", "IV"];

fn is_fall_condition(condition: &JsonValue) -> bool {
    let (codes, text) = condition_terms(condition);
    codes
        .iter()
        .map(|c| normalize_code(c))
        .any(|c| {
            FALL_SNOMED.contains(&c.as_str()) || FALL_ICD_PREFIXES.iter().any(|p| c.starts_with(p))
        })
        || ["fall", "falls", "fell"].iter().any(|t| mentions(&text, t))
}

fn is_intravenous(request: &JsonValue) -> bool {
    let Some(dosages) = request.get("dosageInstruction").and_then(|d| d.as_array()) else {
        return false;
    };
    dosages.iter().filter_map(|d| d.get("route")).any(|route| {
        codings(route).iter().any(|c| IV_ROUTE_CODES.contains(&c.code.as_str()))
            || concept_text(route)
                .map(|t| t.to_lowercase())
                .is_some_and(|t| mentions(&t, "intravenous") || mentions(&t, "iv"))
    })
}

/// Derive the Morse items that are charted in FHIR data.
///
/// History of falling comes from fall-related conditions (any status),
/// secondary diagnosis from two or more active conditions, IV therapy from an
/// active intravenous MedicationRequest. Gait, ambulatory aid and mental
/// status are nursing observations and stay at their lowest-risk defaults.
pub fn morse_input_from_fhir(
    conditions: &[JsonValue],
    medication_requests: &[JsonValue],
) -> MorseInput {
    let active_conditions = conditions.iter().filter(|c| is_active_condition(c)).count();
    MorseInput {
        history_of_falling: conditions.iter().any(is_fall_condition),
        secondary_diagnosis: active_conditions >= 2,
        iv_therapy: medication_requests
            .iter()
            .filter(|m| is_active_medication(m))
            .any(is_intravenous),
        ..Default::default()
    }
}
