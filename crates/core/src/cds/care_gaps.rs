//! Preventive care gap detection.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{mentions, normalize_code};
use crate::extract::{
    Coding, age_in_months, codings, concept_text, condition_terms, event_time, is_active_condition,
    parse_fhir_date,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sex {
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConditionGroup {
    Diabetes,
}

const CPT: &str = "http://www.ama-assn.org/go/cpt";
const HCPCS: &str = "https://www.cms.gov/Medicare/Coding/HCPCSReleaseCodeSets";
const LOINC: &str = "http://loinc.org";
const SNOMED: &str = "http://snomed.info/sct";
const CVX: &str = "http://hl7.org/fhir/sid/cvx";

/// Resource type a clinical event was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Procedure,
    Observation,
    DiagnosticReport,
    Immunization,
}

impl EventSource {
    fn from_resource_type(resource_type: &str) -> Option<Self> {
        match resource_type {
            "Procedure" => Some(Self::Procedure),
            "Observation" => Some(Self::Observation),
            "DiagnosticReport" => Some(Self::DiagnosticReport),
            "Immunization" => Some(Self::Immunization),
            _ => None,
        }
    }
}

const PERFORMED: &[EventSource] = &[
    EventSource::Procedure,
    EventSource::Observation,
    EventSource::DiagnosticReport,
];
const ADMINISTERED: &[EventSource] = &[EventSource::Immunization];

/// A preventive care recommendation
struct CareGapRule {
    id: &'static str,
    title: &'static str,
    sex: Option<Sex>,
    min_age_months: i32,
    /// Inclusive upper bound in years
    max_age_years: Option<i32>,
    /// `None` means a single lifetime event satisfies the rule
    interval_months: Option<u32>,
    /// Resource types that can satisfy the rule
    sources: &'static [EventSource],
    /// `(system, code)` pairs
    codes: &'static [(&'static str, &'static str)],
    keywords: &'static [&'static str],
    requires: Option<ConditionGroup>,
}

const RULES: &[CareGapRule] = &[
    CareGapRule {
        id: "colorectal-cancer-screening",
        title: "Colorectal cancer screening",
        sex: None,
        min_age_months: 45 * 12,
        max_age_years: Some(75),
        interval_months: Some(120),
        sources: PERFORMED,
        codes: &[
            (CPT, "45378"),
            (CPT, "45380"),
            (CPT, "45381"),
            (CPT, "45384"),
            (CPT, "45385"),
            (HCPCS, "G0105"),
            (HCPCS, "G0121"),
            (SNOMED, "73761001"),
        ],
        keywords: &["colonoscopy"],
        requires: None,
    },
    CareGapRule {
        id: "breast-cancer-screening",
        title: "Breast cancer screening (mammography)",
        sex: Some(Sex::Female),
        min_age_months: 50 * 12,
        max_age_years: Some(74),
        interval_months: Some(24),
        sources: PERFORMED,
        codes: &[
            (CPT, "77065"),
            (CPT, "77066"),
            (CPT, "77067"),
            (LOINC, "24606-6"),
            (LOINC, "26346-7"),
            (SNOMED, "71651007"),
        ],
        keywords: &["mammogram", "mammography"],
        requires: None,
    },
    CareGapRule {
        id: "cervical-cancer-screening",
        title: "Cervical cancer screening",
        sex: Some(Sex::Female),
        min_age_months: 21 * 12,
        max_age_years: Some(65),
        interval_months: Some(36),
        sources: PERFORMED,
        codes: &[
            (CPT, "88142"),
            (CPT, "88175"),
            (LOINC, "10524-7"),
            (LOINC, "19762-4"),
            (SNOMED, "171149006"),
        ],
        keywords: &["pap smear", "cervical cytology"],
        requires: None,
    },
    CareGapRule {
        id: "lipid-screening",
        title: "Lipid panel",
        sex: None,
        min_age_months: 40 * 12,
        max_age_years: Some(75),
        interval_months: Some(60),
        sources: PERFORMED,
        codes: &[
            (CPT, "80061"),
            (LOINC, "57698-3"),
            (LOINC, "24331-1"),
            (LOINC, "2093-3"),
            (LOINC, "2089-1"),
            (LOINC, "13457-7"),
        ],
        keywords: &["lipid panel"],
        requires: None,
    },
    CareGapRule {
        id: "diabetes-hba1c",
        title: "Hemoglobin A1c for diabetes",
        sex: None,
        min_age_months: 0,
        max_age_years: None,
        interval_months: Some(6),
        sources: PERFORMED,
        codes: &[(CPT, "83036"), (LOINC, "4548-4"), (LOINC, "17856-6")],
        keywords: &["hba1c", "hemoglobin a1c"],
        requires: Some(ConditionGroup::Diabetes),
    },
    CareGapRule {
        id: "diabetes-eye-exam",
        title: "Diabetic retinal eye exam",
        sex: None,
        min_age_months: 0,
        max_age_years: None,
        interval_months: Some(12),
        sources: PERFORMED,
        codes: &[(CPT, "92250"), (CPT, "2022F"), (CPT, "2023F"), (SNOMED, "252779009")],
        keywords: &["retinal exam", "dilated eye exam", "retinopathy screening"],
        requires: Some(ConditionGroup::Diabetes),
    },
    CareGapRule {
        id: "influenza-vaccine",
        title: "Annual influenza vaccination",
        sex: None,
        min_age_months: 6,
        max_age_years: None,
        interval_months: Some(12),
        sources: ADMINISTERED,
        codes: &[
            (CVX, "88"),
            (CVX, "140"),
            (CVX, "141"),
            (CVX, "150"),
            (CVX, "155"),
            (CVX, "158"),
            (CVX, "161"),
            (CVX, "171"),
            (CVX, "185"),
            (CVX, "186"),
            (CVX, "197"),
            (CVX, "205"),
        ],
        keywords: &["influenza"],
        requires: None,
    },
    CareGapRule {
        id: "pneumococcal-vaccine",
        title: "Pneumococcal vaccination",
        sex: None,
        min_age_months: 65 * 12,
        max_age_years: None,
        interval_months: None,
        sources: ADMINISTERED,
        codes: &[(CVX, "33"), (CVX, "133"), (CVX, "152"), (CVX, "215"), (CVX, "216")],
        keywords: &["pneumococcal"],
        requires: None,
    },
];

const DIABETES_ICD: &[&str] = &["E10", "E11", "E13"];
const DIABETES_SNOMED: &[&str] = &["44054006", "46635009", "73211009"];

fn in_group(condition: &JsonValue, group: ConditionGroup) -> bool {
    match group {
        ConditionGroup::Diabetes => {
            let (codes, text) = condition_terms(condition);
            codes.iter().any(|c| {
                let c = normalize_code(c);
                DIABETES_SNOMED.contains(&c.as_str()) || DIABETES_ICD.iter().any(|p| c.starts_with(p))
            }) || mentions(&text, "diabetes")
        }
    }
}

/// A dated clinical event that may satisfy a rule
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalEvent {
    pub source: EventSource,
    pub codes: Vec<Coding>,
    /// Lowercased display text
    pub text: String,
    pub date: NaiveDate,
}

impl ClinicalEvent {
    /// Build an event from a Procedure, Observation, DiagnosticReport or
    /// Immunization. Other resource types, resources without a usable date
    /// and those that did not happen (`not-done`, `entered-in-error`,
    /// `cancelled`) yield `None`.
    pub fn from_resource(resource: &JsonValue) -> Option<Self> {
        let source = resource
            .get("resourceType")
            .and_then(|t| t.as_str())
            .and_then(EventSource::from_resource_type)?;
        if matches!(
            resource.get("status").and_then(|s| s.as_str()),
            Some("not-done" | "entered-in-error" | "cancelled")
        ) {
            return None;
        }
        let concept = match source {
            EventSource::Immunization => resource.get("vaccineCode"),
            _ => resource.get("code"),
        }?;
        let date = event_time(resource).map(|t| t.date_naive()).or_else(|| {
            resource
                .get("occurrenceString")
                .and_then(|s| s.as_str())
                .and_then(parse_fhir_date)
        })?;
        Some(Self {
            source,
            codes: codings(concept),
            text: concept_text(concept).unwrap_or_default().to_lowercase(),
            date,
        })
    }

    /// A coding without a system matches on the code alone.
    fn satisfies(&self, rule: &CareGapRule) -> bool {
        if !rule.sources.contains(&self.source) {
            return false;
        }
        self.codes.iter().any(|coding| {
            rule.codes.iter().any(|(system, code)| {
                coding.code == *code && coding.system.as_deref().is_none_or(|s| s == *system)
            })
        }) || rule.keywords.iter().any(|k| mentions(&self.text, k))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapStatus {
    /// Never performed
    Due,
    /// Last performed longer ago than the interval
    Overdue,
    Satisfied,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareGap {
    pub rule_id: String,
    pub title: String,
    pub status: GapStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_performed: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due: Option<NaiveDate>,
}

/// Who the rules are evaluated for
#[derive(Debug, Clone)]
pub struct CareGapContext<'a> {
    pub birth_date: NaiveDate,
    pub gender: Option<&'a str>,
    pub conditions: &'a [JsonValue],
    pub events: &'a [ClinicalEvent],
}

/// Evaluate every applicable rule on `today`.
///
/// Results follow rule-table order. Satisfied rules are included only when
/// `include_satisfied` is set.
pub fn evaluate_care_gaps(
    ctx: &CareGapContext<'_>,
    today: NaiveDate,
    include_satisfied: bool,
) -> Vec<CareGap> {
    let age_months = age_in_months(ctx.birth_date, today);
    let active: Vec<&JsonValue> = ctx
        .conditions
        .iter()
        .filter(|c| is_active_condition(c))
        .collect();

    RULES
        .iter()
        .filter(|rule| match rule.sex {
            Some(Sex::Female) => ctx.gender == Some("female"),
            None => true,
        })
        .filter(|rule| age_months >= rule.min_age_months)
        .filter(|rule| rule.max_age_years.is_none_or(|max| age_months < (max + 1) * 12))
        .filter(|rule| {
            rule.requires
                .is_none_or(|group| active.iter().any(|c| in_group(c, group)))
        })
        .filter_map(|rule| {
            let last = ctx
                .events
                .iter()
                .filter(|e| e.date <= today && e.satisfies(rule))
                .map(|e| e.date)
                .max();

            let next_due = match (last, rule.interval_months) {
                (Some(last), Some(months)) => last.checked_add_months(Months::new(months)),
                _ => None,
            };
            let status = match (last, next_due) {
                (None, _) => GapStatus::Due,
                (Some(_), Some(due)) if due <= today => GapStatus::Overdue,
                _ => GapStatus::Satisfied,
            };

            if status == GapStatus::Satisfied && !include_satisfied {
                return None;
            }
            Some(CareGap {
                rule_id: rule.id.to_string(),
                title: rule.title.to_string(),
                status,
                last_performed: last,
                next_due,
            })
        })
        .collect()
}
