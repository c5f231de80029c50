//! 30-day readmission risk (LACE index) and the Charlson comorbidity index it
//! depends on.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{RiskTier, ScoreItem, mentions, normalize_code};
use crate::extract::{codings, condition_terms, is_active_condition, parse_fhir_datetime};

/// Look-back window for emergency department visits
pub const ED_LOOKBACK_DAYS: i64 = 180;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaceInput {
    pub length_of_stay_days: u32,
    pub acute_admission: bool,
    pub charlson_index: u32,
    pub ed_visits_6mo: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadmissionRiskResult {
    /// 0 to 19
    pub score: u32,
    pub tier: RiskTier,
    pub items: Vec<ScoreItem>,
}

fn length_of_stay_points(days: u32) -> u32 {
    match days {
        0 => 0,
        1..=3 => days,
        4..=6 => 4,
        7..=13 => 5,
        _ => 7,
    }
}

fn comorbidity_points(charlson: u32) -> u32 {
    match charlson {
        0..=3 => charlson,
        _ => 5,
    }
}

/// Score the LACE index. 0-4 low, 5-9 moderate, 10+ high.
pub fn lace_index(input: &LaceInput) -> ReadmissionRiskResult {
    let items = vec![
        ScoreItem::new(
            "lengthOfStay",
            length_of_stay_points(input.length_of_stay_days),
            Some(format!("{} days", input.length_of_stay_days)),
        ),
        ScoreItem::new("acuity", if input.acute_admission { 3 } else { 0 }, None),
        ScoreItem::new(
            "comorbidity",
            comorbidity_points(input.charlson_index),
            Some(format!("Charlson {}", input.charlson_index)),
        ),
        ScoreItem::new(
            "edVisits",
            input.ed_visits_6mo.min(4),
            Some(format!("{} visits", input.ed_visits_6mo)),
        ),
    ];

    let score = items.iter().map(|i| i.points).sum();
    let tier = match score {
        0..=4 => RiskTier::Low,
        5..=9 => RiskTier::Moderate,
        _ => RiskTier::High,
    };

    ReadmissionRiskResult { score, tier, items }
}

/// One Charlson category
struct CharlsonCategory {
    name: &'static str,
    weight: u32,
    icd_prefixes: &'static [&'static str],
    keywords: &'static [&'static str],
    /// Less severe category this one replaces when both are present
    supersedes: Option<&'static str>,
}

const CHARLSON: &[CharlsonCategory] = &[
    CharlsonCategory {
        name: "myocardial infarction",
        weight: 1,
        icd_prefixes: &["I21", "I22", "I252"],
        keywords: &["myocardial infarction", "heart attack"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "congestive heart failure",
        weight: 1,
        icd_prefixes: &["I50", "I110", "I130", "I132", "I42", "I43"],
        keywords: &["heart failure", "cardiomyopathy"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "peripheral vascular disease",
        weight: 1,
        icd_prefixes: &["I70", "I71", "I739", "I771"],
        keywords: &["peripheral vascular disease", "peripheral arterial disease", "aortic aneurysm"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "cerebrovascular disease",
        weight: 1,
        icd_prefixes: &["I60", "I61", "I62", "I63", "I64", "I65", "I66", "I67", "I68", "I69", "G45", "G46"],
        keywords: &["stroke", "cerebrovascular", "transient ischemic attack"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "dementia",
        weight: 1,
        icd_prefixes: &["F00", "F01", "F02", "F03", "G30"],
        keywords: &["dementia", "alzheimer", "alzheimer's"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "chronic pulmonary disease",
        weight: 1,
        icd_prefixes: &[
            "J40", "J41", "J42", "J43", "J44", "J45", "J46", "J47", "J60", "J61", "J62", "J63",
            "J64", "J65", "J66", "J67",
        ],
        keywords: &["copd", "chronic obstructive", "emphysema", "asthma", "chronic bronchitis"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "connective tissue disease",
        weight: 1,
        icd_prefixes: &["M05", "M06", "M32", "M33", "M34", "M353"],
        keywords: &["rheumatoid arthritis", "lupus", "scleroderma", "polymyositis"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "peptic ulcer disease",
        weight: 1,
        icd_prefixes: &["K25", "K26", "K27", "K28"],
        keywords: &["peptic ulcer", "gastric ulcer", "duodenal ulcer"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "mild liver disease",
        weight: 1,
        icd_prefixes: &["B18", "K700", "K701", "K702", "K703", "K709", "K73", "K74", "K760"],
        keywords: &["chronic hepatitis", "cirrhosis", "fatty liver"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "diabetes",
        weight: 1,
        icd_prefixes: &["E10", "E11", "E13", "E14"],
        keywords: &["diabetes"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "diabetes with end-organ damage",
        weight: 2,
        icd_prefixes: &[
            "E102", "E103", "E104", "E105", "E107", "E112", "E113", "E114", "E115", "E117",
            "E132", "E133", "E134", "E135", "E137",
        ],
        keywords: &["diabetic nephropathy", "diabetic retinopathy", "diabetic neuropathy", "diabetic foot"],
        supersedes: Some("diabetes"),
    },
    CharlsonCategory {
        name: "hemiplegia",
        weight: 2,
        icd_prefixes: &["G81", "G82", "G041"],
        keywords: &["hemiplegia", "paraplegia", "quadriplegia"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "renal disease",
        weight: 2,
        icd_prefixes: &["N18", "N19", "N052", "N053", "N054", "N055", "N056", "Z49", "Z992"],
        keywords: &["chronic kidney disease", "renal failure", "end stage renal disease", "dialysis"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "malignancy",
        weight: 2,
        icd_prefixes: &[
            "C0", "C1", "C20", "C21", "C22", "C23", "C24", "C25", "C26", "C3", "C40", "C41",
            "C43", "C45", "C46", "C47", "C48", "C49", "C5", "C6", "C70", "C71", "C72", "C73",
            "C74", "C75", "C76", "C81", "C82", "C83", "C84", "C85", "C88", "C9",
        ],
        keywords: &["cancer", "carcinoma", "lymphoma", "leukemia", "melanoma", "malignant neoplasm"],
        supersedes: None,
    },
    CharlsonCategory {
        name: "moderate or severe liver disease",
        weight: 3,
        icd_prefixes: &["I850", "I859", "I864", "I982", "K704", "K711", "K721", "K729", "K765", "K766", "K767"],
        keywords: &["esophageal varices", "hepatic failure", "liver failure", "portal hypertension"],
        supersedes: Some("mild liver disease"),
    },
    CharlsonCategory {
        name: "metastatic solid tumor",
        weight: 6,
        icd_prefixes: &["C77", "C78", "C79", "C80"],
        keywords: &["metastatic", "metastasis", "metastases"],
        supersedes: Some("malignancy"),
    },
    CharlsonCategory {
        name: "AIDS/HIV",
        weight: 6,
        icd_prefixes: &["B20", "B21", "B22", "B24"],
        keywords: &["hiv", "acquired immunodeficiency syndrome"],
        supersedes: None,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharlsonResult {
    pub index: u32,
    /// Matched categories, in table order
    pub categories: Vec<String>,
}

fn matches_category(category: &CharlsonCategory, codes: &[String], text: &str) -> bool {
    codes.iter().any(|code| {
        let code = normalize_code(code);
        category.icd_prefixes.iter().any(|p| code.starts_with(p))
    }) || category.keywords.iter().any(|k| mentions(text, k))
}

/// Charlson comorbidity index (without age points) over active conditions.
///
/// Each category counts once; complicated forms replace their uncomplicated
/// counterpart instead of adding to it.
pub fn charlson_index(conditions: &[JsonValue]) -> CharlsonResult {
    let terms: Vec<(Vec<String>, String)> = conditions
        .iter()
        .filter(|c| is_active_condition(c))
        .map(condition_terms)
        .collect();

    let mut matched: Vec<&CharlsonCategory> = CHARLSON
        .iter()
        .filter(|cat| terms.iter().any(|(codes, text)| matches_category(cat, codes, text)))
        .collect();

    let superseded: Vec<&str> = matched.iter().filter_map(|c| c.supersedes).collect();
    matched.retain(|c| !superseded.contains(&c.name));

    CharlsonResult {
        index: matched.iter().map(|c| c.weight).sum(),
        categories: matched.iter().map(|c| c.name.to_string()).collect(),
    }
}

fn encounter_classes(encounter: &JsonValue) -> Vec<String> {
    match encounter.get("class") {
        Some(JsonValue::Array(concepts)) => concepts
            .iter()
            .flat_map(|c| codings(c))
            .map(|c| c.code)
            .collect(),
        Some(coding) => coding
            .get("code")
            .and_then(|c| c.as_str())
            .map(|c| vec![c.to_string()])
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

fn has_class(encounter: &JsonValue, wanted: &[&str]) -> bool {
    encounter_classes(encounter)
        .iter()
        .any(|c| wanted.contains(&c.as_str()))
}

fn period(encounter: &JsonValue) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let at = |p: &str| {
        encounter
            .pointer(p)
            .and_then(|v| v.as_str())
            .and_then(parse_fhir_datetime)
    };
    (at("/period/start"), at("/period/end"))
}

fn is_emergent(encounter: &JsonValue) -> bool {
    has_class(encounter, &["EMER"])
        || encounter
            .get("priority")
            .map(|p| codings(p).iter().any(|c| matches!(c.code.as_str(), "EM" | "emergency")))
            .unwrap_or(false)
        || encounter
            .pointer("/hospitalization/admitSource")
            .map(|s| codings(s).iter().any(|c| c.code == "emd"))
            .unwrap_or(false)
}

/// Build LACE inputs from the patient's encounters and conditions.
///
/// The index admission is the most recent finished inpatient (`IMP`,
/// `ACUTE`, `NONAC`) encounter with a start and end. ED visits are
/// emergency encounters starting in the 180 days before the index
/// admission. Returns `None` when there is no index admission.
pub fn lace_input_from_fhir(encounters: &[JsonValue], conditions: &[JsonValue]) -> Option<LaceInput> {
    let (index, start, end) = encounters
        .iter()
        .filter(|e| e.get("status").and_then(|s| s.as_str()) == Some("finished"))
        .filter(|e| has_class(e, &["IMP", "ACUTE", "NONAC"]))
        .filter_map(|e| match period(e) {
            (Some(start), Some(end)) if end >= start => Some((e, start, end)),
            _ => None,
        })
        .max_by_key(|(_, start, _)| *start)?;

    let window_start = start - Duration::days(ED_LOOKBACK_DAYS);
    let ed_visits = encounters
        .iter()
        .filter(|e| !std::ptr::eq(*e, index))
        .filter(|e| has_class(e, &["EMER"]))
        .filter(|e| matches!(period(e).0, Some(s) if s >= window_start && s < start))
        .count() as u32;

    Some(LaceInput {
        length_of_stay_days: (end - start).num_days() as u32,
        acute_admission: is_emergent(index),
        charlson_index: charlson_index(conditions).index,
        ed_visits_6mo: ed_visits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(code: &str, text: &str) -> JsonValue {
        json!({
            "resourceType": "Condition",
            "clinicalStatus": {"coding": [{"code": "active"}]},
            "code": {"coding": [{"code": code}], "text": text}
        })
    }

    fn encounter(class: &str, start: &str, end: &str) -> JsonValue {
        json!({
            "resourceType": "Encounter",
            "status": "finished",
            "class": {"code": class},
            "period": {"start": start, "end": end}
        })
    }

    #[test]
    fn length_of_stay_points_follow_table() {
        let expected = [(0, 0), (1, 1), (2, 2), (3, 3), (4, 4), (6, 4), (7, 5), (13, 5), (14, 7), (40, 7)];
        for (days, points) in expected {
            assert_eq!(length_of_stay_points(days), points, "{days} days");
        }
    }

    #[test]
    fn lace_total_and_tiers() {
        let result = lace_index(&LaceInput {
            length_of_stay_days: 5,
            acute_admission: true,
            charlson_index: 6,
            ed_visits_6mo: 7,
        });
        assert_eq!(result.score, 4 + 3 + 5 + 4);
        assert_eq!(result.tier, RiskTier::High);

        let low = lace_index(&LaceInput {
            length_of_stay_days: 1,
            charlson_index: 1,
            ..Default::default()
        });
        assert_eq!((low.score, low.tier), (2, RiskTier::Low));

        let moderate = lace_index(&LaceInput {
            length_of_stay_days: 2,
            acute_admission: true,
            ..Default::default()
        });
        assert_eq!((moderate.score, moderate.tier), (5, RiskTier::Moderate));
    }

    #[test]
    fn charlson_counts_categories_once_and_supersedes() {
        let conditions = vec![
            condition("E11.9", "Type 2 diabetes mellitus"),
            condition("E11.21", "Type 2 diabetes with diabetic nephropathy"),
            condition("I50.9", "Heart failure"),
            condition("I50.22", "Chronic systolic heart failure"),
            condition("C34.90", "Lung cancer"),
            condition("C78.00", "Secondary malignant neoplasm of lung"),
        ];
        let result = charlson_index(&conditions);
        assert_eq!(
            result.categories,
            vec!["congestive heart failure", "diabetes with end-organ damage", "metastatic solid tumor"]
        );
        assert_eq!(result.index, 1 + 2 + 6);
    }

    #[test]
    fn charlson_ignores_inactive_and_matches_keywords() {
        let mut resolved = condition("J45.909", "Asthma");
        resolved["clinicalStatus"] = json!({"coding": [{"code": "resolved"}]});
        let copd = json!({"code": {"text": "COPD exacerbation"}});
        let hearing = json!({"code": {"text": "Uses hearing aids"}});

        let result = charlson_index(&[resolved, copd, hearing]);
        assert_eq!(result.categories, vec!["chronic pulmonary disease"]);
        assert_eq!(result.index, 1);
    }

    #[test]
    fn builds_lace_input_from_encounters() {
        let mut index = encounter("IMP", "2024-03-01T10:00:00Z", "2024-03-06T09:00:00Z");
        index["hospitalization"] = json!({"admitSource": {"coding": [{"code": "emd"}]}});
        let older = encounter("IMP", "2023-01-01T00:00:00Z", "2023-01-03T00:00:00Z");
        let ed_recent = encounter("EMER", "2024-02-10T00:00:00Z", "2024-02-10T05:00:00Z");
        let ed_recent2 = encounter("EMER", "2023-10-01T00:00:00Z", "2023-10-01T05:00:00Z");
        let ed_old = encounter("EMER", "2023-06-01T00:00:00Z", "2023-06-01T05:00:00Z");
        let conditions = vec![condition("I21.4", "NSTEMI")];

        let input = lace_input_from_fhir(
            &[ed_old, older, index, ed_recent, ed_recent2],
            &conditions,
        )
        .unwrap();
        assert_eq!(
            input,
            LaceInput {
                length_of_stay_days: 4,
                acute_admission: true,
                charlson_index: 1,
                ed_visits_6mo: 2,
            }
        );
    }

    #[test]
    fn ed_window_is_anchored_to_index_admission() {
        let index = encounter("IMP", "2024-03-01T10:00:00Z", "2024-03-06T09:00:00Z");
        // 179 days before admission, then one after discharge
        let inside = encounter("EMER", "2023-09-04T10:00:00Z", "2023-09-04T12:00:00Z");
        let after = encounter("EMER", "2024-04-01T00:00:00Z", "2024-04-01T05:00:00Z");

        let input = lace_input_from_fhir(&[index, inside, after], &[]).unwrap();
        assert_eq!(input.ed_visits_6mo, 1);
    }

    #[test]
    fn no_inpatient_stay_means_no_lace() {
        let ambulatory = encounter("AMB", "2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z");
        assert!(lace_input_from_fhir(&[ambulatory], &[]).is_none());
    }
}
