//! qSOFA and SIRS sepsis screening.

use serde::{Deserialize, Serialize};

use super::RiskTier;
use super::vitals::VitalSigns;

/// qSOFA thresholds
pub const QSOFA_RESPIRATORY_RATE: f64 = 22.0;
pub const QSOFA_SYSTOLIC_BP: f64 = 100.0;
/// Any Glasgow Coma Scale below this counts as altered mentation
pub const GCS_NORMAL: f64 = 15.0;

/// Bedside inputs for qSOFA
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QsofaInput {
    pub respiratory_rate: Option<f64>,
    pub systolic_bp: Option<f64>,
    /// Clinician-assessed altered mentation. Either this flag or a GCS
    /// below 15 meets the criterion.
    pub altered_mentation: Option<bool>,
    pub gcs: Option<f64>,
}

/// A single screening criterion and whether it was met
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub name: String,
    pub met: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QsofaResult {
    /// 0 to 3
    pub score: u8,
    pub tier: RiskTier,
    pub criteria: Vec<Criterion>,
    /// Inputs that were not available and therefore scored 0
    pub missing: Vec<String>,
}

/// Compute the quick SOFA score.
///
/// One point each for respiratory rate >= 22/min, altered mentation and
/// systolic blood pressure <= 100 mmHg. Tier: 0 low, 1 moderate, 2+ high.
pub fn qsofa(input: &QsofaInput) -> QsofaResult {
    let mut criteria = Vec::with_capacity(3);
    let mut missing = Vec::new();

    match input.respiratory_rate {
        Some(rr) => criteria.push(Criterion {
            name: "respiratoryRate".into(),
            met: rr >= QSOFA_RESPIRATORY_RATE,
            value: Some(rr),
        }),
        None => missing.push("respiratoryRate".to_string()),
    }

    if input.altered_mentation.is_none() && input.gcs.is_none() {
        missing.push("alteredMentation".to_string());
    } else {
        criteria.push(Criterion {
            name: "alteredMentation".into(),
            met: input.altered_mentation.unwrap_or(false)
                || input.gcs.is_some_and(|gcs| gcs < GCS_NORMAL),
            value: input.gcs,
        });
    }

    match input.systolic_bp {
        Some(sbp) => criteria.push(Criterion {
            name: "systolicBp".into(),
            met: sbp <= QSOFA_SYSTOLIC_BP,
            value: Some(sbp),
        }),
        None => missing.push("systolicBp".to_string()),
    }

    let score = criteria.iter().filter(|c| c.met).count() as u8;
    let tier = match score {
        0 => RiskTier::Low,
        1 => RiskTier::Moderate,
        _ => RiskTier::High,
    };

    QsofaResult {
        score,
        tier,
        criteria,
        missing,
    }
}

/// Inputs for the SIRS criteria
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SirsInput {
    /// Degrees Celsius
    pub temperature: Option<f64>,
    pub heart_rate: Option<f64>,
    pub respiratory_rate: Option<f64>,
    /// 10^9/L
    pub wbc: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SirsResult {
    pub count: u8,
    /// Two or more criteria met
    pub sirs_met: bool,
    pub criteria: Vec<Criterion>,
    pub missing: Vec<String>,
}

/// Evaluate the systemic inflammatory response syndrome criteria
pub fn sirs(input: &SirsInput) -> SirsResult {
    let checks: [(&str, Option<f64>, fn(f64) -> bool); 4] = [
        ("temperature", input.temperature, |t| !(36.0..=38.0).contains(&t)),
        ("heartRate", input.heart_rate, |hr| hr > 90.0),
        ("respiratoryRate", input.respiratory_rate, |rr| rr > 20.0),
        ("wbc", input.wbc, |wbc| !(4.0..=12.0).contains(&wbc)),
    ];

    let mut criteria = Vec::new();
    let mut missing = Vec::new();
    for (name, value, test) in checks {
        match value {
            Some(v) => criteria.push(Criterion {
                name: name.to_string(),
                met: test(v),
                value: Some(v),
            }),
            None => missing.push(name.to_string()),
        }
    }

    let count = criteria.iter().filter(|c| c.met).count() as u8;
    SirsResult {
        count,
        sirs_met: count >= 2,
        criteria,
        missing,
    }
}

/// Combined sepsis screen computed from charted vitals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SepsisAssessment {
    pub qsofa: QsofaResult,
    pub sirs: SirsResult,
    pub vitals: VitalSigns,
}

pub fn assess_sepsis(vitals: VitalSigns) -> SepsisAssessment {
    let value = |r: Option<super::vitals::Reading>| r.map(|r| r.value);
    let qsofa = qsofa(&QsofaInput {
        respiratory_rate: value(vitals.respiratory_rate),
        systolic_bp: value(vitals.systolic_bp),
        altered_mentation: None,
        gcs: value(vitals.gcs),
    });
    let sirs = sirs(&SirsInput {
        temperature: value(vitals.temperature),
        heart_rate: value(vitals.heart_rate),
        respiratory_rate: value(vitals.respiratory_rate),
        wbc: value(vitals.wbc),
    });
    SepsisAssessment { qsofa, sirs, vitals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cds::vitals::Reading;

    #[test]
    fn qsofa_thresholds_are_inclusive() {
        let result = qsofa(&QsofaInput {
            respiratory_rate: Some(22.0),
            systolic_bp: Some(100.0),
            altered_mentation: Some(false),
            gcs: None,
        });
        assert_eq!(result.score, 2);
        assert_eq!(result.tier, RiskTier::High);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn qsofa_tiers() {
        let normal = QsofaInput {
            respiratory_rate: Some(16.0),
            systolic_bp: Some(120.0),
            altered_mentation: Some(false),
            gcs: None,
        };
        assert_eq!(qsofa(&normal).score, 0);
        assert_eq!(qsofa(&normal).tier, RiskTier::Low);

        let one = QsofaInput {
            respiratory_rate: Some(21.9),
            systolic_bp: Some(101.0),
            gcs: Some(14.0),
            altered_mentation: None,
        };
        assert_eq!(qsofa(&one).score, 1);
        assert_eq!(qsofa(&one).tier, RiskTier::Moderate);

        let all = QsofaInput {
            respiratory_rate: Some(30.0),
            systolic_bp: Some(85.0),
            altered_mentation: Some(true),
            gcs: Some(15.0),
        };
        assert_eq!(qsofa(&all).score, 3);
    }

    #[test]
    fn low_gcs_counts_even_when_flag_is_false() {
        let result = qsofa(&QsofaInput {
            respiratory_rate: Some(16.0),
            systolic_bp: Some(120.0),
            altered_mentation: Some(false),
            gcs: Some(12.0),
        });
        assert_eq!(result.score, 1);
        assert_eq!(result.tier, RiskTier::Moderate);
        assert!(result.missing.is_empty());

        let normal_gcs = qsofa(&QsofaInput {
            altered_mentation: Some(false),
            gcs: Some(15.0),
            ..Default::default()
        });
        assert_eq!(normal_gcs.score, 0);
    }

    #[test]
    fn missing_inputs_score_zero_and_are_reported() {
        let result = qsofa(&QsofaInput {
            respiratory_rate: Some(25.0),
            ..Default::default()
        });
        assert_eq!(result.score, 1);
        assert_eq!(result.missing, vec!["alteredMentation", "systolicBp"]);
    }

    #[test]
    fn sirs_counts_out_of_range_values() {
        let result = sirs(&SirsInput {
            temperature: Some(38.4),
            heart_rate: Some(95.0),
            respiratory_rate: Some(18.0),
            wbc: None,
        });
        assert_eq!(result.count, 2);
        assert!(result.sirs_met);
        assert_eq!(result.missing, vec!["wbc"]);

        let low_temp = sirs(&SirsInput {
            temperature: Some(35.5),
            ..Default::default()
        });
        assert_eq!(low_temp.count, 1);
        assert!(!low_temp.sirs_met);
    }

    #[test]
    fn assesses_from_vitals() {
        let reading = |value| Some(Reading { value, observed_at: None });
        let vitals = VitalSigns {
            respiratory_rate: reading(26.0),
            systolic_bp: reading(92.0),
            gcs: reading(15.0),
            heart_rate: reading(110.0),
            ..Default::default()
        };
        let assessment = assess_sepsis(vitals);
        assert_eq!(assessment.qsofa.score, 2);
        assert_eq!(assessment.sirs.count, 2);
    }
}
