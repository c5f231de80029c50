//! Drug-drug and drug-allergy interaction checking.
//!
//! Medication names are resolved to ingredients through a small built-in
//! dictionary (generic names plus common brands); each ingredient carries its
//! drug classes. Interaction rules are written against either ingredients or
//! classes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::mentions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Contraindicated,
}

struct Ingredient {
    name: &'static str,
    brands: &'static [&'static str],
    classes: &'static [&'static str],
}

const INGREDIENTS: &[Ingredient] = &[
    Ingredient { name: "warfarin", brands: &["coumadin", "jantoven"], classes: &["anticoagulant"] },
    Ingredient { name: "apixaban", brands: &["eliquis"], classes: &["anticoagulant"] },
    Ingredient { name: "rivaroxaban", brands: &["xarelto"], classes: &["anticoagulant"] },
    Ingredient { name: "heparin", brands: &[], classes: &["anticoagulant"] },
    Ingredient { name: "aspirin", brands: &["bayer", "ecotrin"], classes: &["nsaid", "antiplatelet"] },
    Ingredient { name: "ibuprofen", brands: &["advil", "motrin"], classes: &["nsaid"] },
    Ingredient { name: "naproxen", brands: &["aleve", "naprosyn"], classes: &["nsaid"] },
    Ingredient { name: "diclofenac", brands: &["voltaren"], classes: &["nsaid"] },
    Ingredient { name: "celecoxib", brands: &["celebrex"], classes: &["nsaid"] },
    Ingredient { name: "ketorolac", brands: &["toradol"], classes: &["nsaid"] },
    Ingredient { name: "clopidogrel", brands: &["plavix"], classes: &["antiplatelet"] },
    Ingredient { name: "simvastatin", brands: &["zocor"], classes: &["statin"] },
    Ingredient { name: "lovastatin", brands: &["mevacor"], classes: &["statin"] },
    Ingredient { name: "atorvastatin", brands: &["lipitor"], classes: &["statin"] },
    Ingredient { name: "clarithromycin", brands: &["biaxin"], classes: &["macrolide", "strong-cyp3a4-inhibitor"] },
    Ingredient { name: "erythromycin", brands: &[], classes: &["macrolide", "strong-cyp3a4-inhibitor"] },
    Ingredient { name: "azithromycin", brands: &["zithromax"], classes: &["macrolide", "qt-prolonging"] },
    Ingredient { name: "ketoconazole", brands: &[], classes: &["azole-antifungal", "strong-cyp3a4-inhibitor"] },
    Ingredient { name: "itraconazole", brands: &["sporanox"], classes: &["azole-antifungal", "strong-cyp3a4-inhibitor"] },
    Ingredient { name: "fluconazole", brands: &["diflucan"], classes: &["azole-antifungal"] },
    Ingredient { name: "lisinopril", brands: &["prinivil", "zestril"], classes: &["ace-inhibitor"] },
    Ingredient { name: "enalapril", brands: &["vasotec"], classes: &["ace-inhibitor"] },
    Ingredient { name: "ramipril", brands: &["altace"], classes: &["ace-inhibitor"] },
    Ingredient { name: "losartan", brands: &["cozaar"], classes: &["arb"] },
    Ingredient { name: "valsartan", brands: &["diovan"], classes: &["arb"] },
    Ingredient { name: "spironolactone", brands: &["aldactone"], classes: &["potassium-sparing-diuretic"] },
    Ingredient { name: "potassium", brands: &["klor-con"], classes: &["potassium-supplement"] },
    Ingredient { name: "furosemide", brands: &["lasix"], classes: &["loop-diuretic"] },
    Ingredient { name: "sertraline", brands: &["zoloft"], classes: &["ssri", "serotonergic"] },
    Ingredient { name: "fluoxetine", brands: &["prozac"], classes: &["ssri", "serotonergic"] },
    Ingredient { name: "citalopram", brands: &["celexa"], classes: &["ssri", "serotonergic", "qt-prolonging"] },
    Ingredient { name: "escitalopram", brands: &["lexapro"], classes: &["ssri", "serotonergic"] },
    Ingredient { name: "paroxetine", brands: &["paxil"], classes: &["ssri", "serotonergic"] },
    Ingredient { name: "phenelzine", brands: &["nardil"], classes: &["maoi"] },
    Ingredient { name: "selegiline", brands: &["emsam"], classes: &["maoi"] },
    Ingredient { name: "linezolid", brands: &["zyvox"], classes: &["maoi"] },
    Ingredient { name: "tramadol", brands: &["ultram"], classes: &["opioid", "serotonergic"] },
    Ingredient { name: "oxycodone", brands: &["oxycontin", "percocet"], classes: &["opioid"] },
    Ingredient { name: "hydrocodone", brands: &["norco", "vicodin"], classes: &["opioid"] },
    Ingredient { name: "morphine", brands: &[], classes: &["opioid"] },
    Ingredient { name: "fentanyl", brands: &["duragesic"], classes: &["opioid"] },
    Ingredient { name: "codeine", brands: &[], classes: &["opioid"] },
    Ingredient { name: "alprazolam", brands: &["xanax"], classes: &["benzodiazepine"] },
    Ingredient { name: "lorazepam", brands: &["ativan"], classes: &["benzodiazepine"] },
    Ingredient { name: "diazepam", brands: &["valium"], classes: &["benzodiazepine"] },
    Ingredient { name: "clonazepam", brands: &["klonopin"], classes: &["benzodiazepine"] },
    Ingredient { name: "nitroglycerin", brands: &["nitrostat"], classes: &["nitrate"] },
    Ingredient { name: "isosorbide", brands: &["imdur"], classes: &["nitrate"] },
    Ingredient { name: "sildenafil", brands: &["viagra", "revatio"], classes: &["pde5-inhibitor"] },
    Ingredient { name: "tadalafil", brands: &["cialis"], classes: &["pde5-inhibitor"] },
    Ingredient { name: "amiodarone", brands: &["pacerone"], classes: &["antiarrhythmic", "qt-prolonging"] },
    Ingredient { name: "ciprofloxacin", brands: &["cipro"], classes: &["fluoroquinolone", "qt-prolonging"] },
    Ingredient { name: "levofloxacin", brands: &["levaquin"], classes: &["fluoroquinolone", "qt-prolonging"] },
    Ingredient { name: "methotrexate", brands: &["trexall"], classes: &["antimetabolite"] },
    Ingredient { name: "sulfamethoxazole", brands: &["bactrim", "septra"], classes: &["sulfonamide"] },
    Ingredient { name: "amoxicillin", brands: &["amoxil", "augmentin"], classes: &["penicillin", "beta-lactam"] },
    Ingredient { name: "ampicillin", brands: &[], classes: &["penicillin", "beta-lactam"] },
    Ingredient { name: "penicillin", brands: &[], classes: &["penicillin", "beta-lactam"] },
    Ingredient { name: "piperacillin", brands: &["zosyn"], classes: &["penicillin", "beta-lactam"] },
    Ingredient { name: "cephalexin", brands: &["keflex"], classes: &["cephalosporin", "beta-lactam"] },
    Ingredient { name: "cefazolin", brands: &["ancef"], classes: &["cephalosporin", "beta-lactam"] },
    Ingredient { name: "ceftriaxone", brands: &["rocephin"], classes: &["cephalosporin", "beta-lactam"] },
    Ingredient { name: "cefuroxime", brands: &["ceftin"], classes: &["cephalosporin", "beta-lactam"] },
    Ingredient { name: "digoxin", brands: &["lanoxin"], classes: &["cardiac-glycoside"] },
    Ingredient { name: "lithium", brands: &["lithobid"], classes: &["mood-stabilizer"] },
    Ingredient { name: "omeprazole", brands: &["prilosec"], classes: &["ppi"] },
    Ingredient { name: "metformin", brands: &["glucophage"], classes: &["biguanide"] },
];

struct InteractionRule {
    a: &'static str,
    b: &'static str,
    severity: Severity,
    description: &'static str,
    management: &'static str,
}

const RULES: &[InteractionRule] = &[
    InteractionRule {
        a: "anticoagulant", b: "nsaid", severity: Severity::Major,
        description: "Increased risk of serious bleeding.",
        management: "Avoid combination or add gastroprotection and monitor for bleeding.",
    },
    InteractionRule {
        a: "anticoagulant", b: "antiplatelet", severity: Severity::Major,
        description: "Additive antithrombotic effect; increased bleeding risk.",
        management: "Confirm indication for dual therapy; monitor for bleeding.",
    },
    InteractionRule {
        a: "warfarin", b: "azole-antifungal", severity: Severity::Major,
        description: "CYP2C9 inhibition raises warfarin levels and INR.",
        management: "Reduce warfarin dose and monitor INR closely.",
    },
    InteractionRule {
        a: "warfarin", b: "amiodarone", severity: Severity::Major,
        description: "Amiodarone inhibits warfarin metabolism; INR rises over weeks.",
        management: "Reduce warfarin dose by 30-50% and monitor INR.",
    },
    InteractionRule {
        a: "warfarin", b: "sulfonamide", severity: Severity::Major,
        description: "Sulfamethoxazole markedly potentiates warfarin.",
        management: "Prefer an alternative antibiotic or monitor INR closely.",
    },
    InteractionRule {
        a: "simvastatin", b: "strong-cyp3a4-inhibitor", severity: Severity::Contraindicated,
        description: "Greatly increased statin exposure; risk of rhabdomyolysis.",
        management: "Do not combine; hold the statin during therapy.",
    },
    InteractionRule {
        a: "lovastatin", b: "strong-cyp3a4-inhibitor", severity: Severity::Contraindicated,
        description: "Greatly increased statin exposure; risk of rhabdomyolysis.",
        management: "Do not combine; hold the statin during therapy.",
    },
    InteractionRule {
        a: "atorvastatin", b: "strong-cyp3a4-inhibitor", severity: Severity::Moderate,
        description: "Increased atorvastatin exposure; myopathy risk.",
        management: "Limit atorvastatin dose and monitor for muscle symptoms.",
    },
    InteractionRule {
        a: "ace-inhibitor", b: "potassium-sparing-diuretic", severity: Severity::Major,
        description: "Risk of hyperkalemia.",
        management: "Monitor serum potassium and renal function.",
    },
    InteractionRule {
        a: "arb", b: "potassium-sparing-diuretic", severity: Severity::Major,
        description: "Risk of hyperkalemia.",
        management: "Monitor serum potassium and renal function.",
    },
    InteractionRule {
        a: "ace-inhibitor", b: "potassium-supplement", severity: Severity::Moderate,
        description: "Risk of hyperkalemia.",
        management: "Monitor serum potassium.",
    },
    InteractionRule {
        a: "ace-inhibitor", b: "arb", severity: Severity::Major,
        description: "Dual renin-angiotensin blockade: hyperkalemia, hypotension, renal impairment.",
        management: "Avoid combination.",
    },
    InteractionRule {
        a: "maoi", b: "serotonergic", severity: Severity::Contraindicated,
        description: "Risk of serotonin syndrome.",
        management: "Do not combine; observe washout periods.",
    },
    InteractionRule {
        a: "ssri", b: "tramadol", severity: Severity::Major,
        description: "Serotonin syndrome and lowered seizure threshold.",
        management: "Use an alternative analgesic or monitor closely.",
    },
    InteractionRule {
        a: "opioid", b: "benzodiazepine", severity: Severity::Major,
        description: "Profound sedation and respiratory depression.",
        management: "Avoid or use the lowest doses; monitor respiration.",
    },
    InteractionRule {
        a: "nitrate", b: "pde5-inhibitor", severity: Severity::Contraindicated,
        description: "Severe, potentially fatal hypotension.",
        management: "Do not combine.",
    },
    InteractionRule {
        a: "qt-prolonging", b: "qt-prolonging", severity: Severity::Major,
        description: "Additive QT prolongation; risk of torsades de pointes.",
        management: "Obtain a baseline ECG and monitor QTc and electrolytes.",
    },
    InteractionRule {
        a: "nsaid", b: "nsaid", severity: Severity::Moderate,
        description: "Duplicate NSAID therapy increases GI and renal toxicity.",
        management: "Use a single NSAID.",
    },
    InteractionRule {
        a: "methotrexate", b: "nsaid", severity: Severity::Major,
        description: "Reduced methotrexate clearance; toxicity.",
        management: "Avoid with high-dose methotrexate; monitor counts and renal function.",
    },
    InteractionRule {
        a: "methotrexate", b: "sulfonamide", severity: Severity::Major,
        description: "Additive antifolate effect; bone marrow suppression.",
        management: "Avoid combination.",
    },
    InteractionRule {
        a: "digoxin", b: "amiodarone", severity: Severity::Major,
        description: "Amiodarone raises digoxin levels.",
        management: "Halve the digoxin dose and monitor levels.",
    },
    InteractionRule {
        a: "lithium", b: "nsaid", severity: Severity::Major,
        description: "Reduced lithium clearance; toxicity.",
        management: "Monitor lithium levels.",
    },
    InteractionRule {
        a: "lithium", b: "ace-inhibitor", severity: Severity::Major,
        description: "Reduced lithium clearance; toxicity.",
        management: "Monitor lithium levels.",
    },
    InteractionRule {
        a: "lithium", b: "loop-diuretic", severity: Severity::Moderate,
        description: "Volume depletion may raise lithium levels.",
        management: "Monitor lithium levels and hydration.",
    },
    InteractionRule {
        a: "clopidogrel", b: "omeprazole", severity: Severity::Moderate,
        description: "Omeprazole reduces clopidogrel activation.",
        management: "Prefer pantoprazole.",
    },
];

/// Drug classes for which an allergy to one member implies avoiding the class
const ALLERGENIC_CLASSES: &[&str] = &[
    "penicillin",
    "cephalosporin",
    "sulfonamide",
    "nsaid",
    "macrolide",
    "fluoroquinolone",
];

/// Free-text allergy names that designate a whole class
const CLASS_ALIASES: &[(&str, &str)] = &[
    ("penicillins", "penicillin"),
    ("cephalosporins", "cephalosporin"),
    ("sulfa", "sulfonamide"),
    ("sulfonamides", "sulfonamide"),
    ("sulfonamide", "sulfonamide"),
    ("nsaid", "nsaid"),
    ("nsaids", "nsaid"),
    ("macrolides", "macrolide"),
    ("fluoroquinolones", "fluoroquinolone"),
    ("quinolones", "fluoroquinolone"),
];

/// Known cross-reactivity between allergenic classes
const CROSS_REACTIVE: &[(&str, &str, Severity)] =
    &[("penicillin", "cephalosporin", Severity::Moderate)];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub substance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugInteraction {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: Severity,
    pub description: String,
    pub management: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyAlert {
    pub medication: String,
    pub allergen: String,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionReport {
    pub drug_interactions: Vec<DrugInteraction>,
    pub allergy_alerts: Vec<AllergyAlert>,
    /// Medication names no ingredient could be resolved for
    pub unrecognized: Vec<String>,
}

/// A medication with its resolved ingredients and classes
struct Resolved<'a> {
    name: &'a str,
    ingredients: BTreeSet<&'static str>,
    classes: BTreeSet<&'static str>,
}

impl Resolved<'_> {
    fn has(&self, term: &str) -> bool {
        self.ingredients.contains(term) || self.classes.contains(term)
    }
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

fn resolve(name: &str) -> Resolved<'_> {
    let words = words(name);
    let mut resolved = Resolved {
        name,
        ingredients: BTreeSet::new(),
        classes: BTreeSet::new(),
    };
    for ingredient in INGREDIENTS {
        let hit = words
            .iter()
            .any(|w| w == ingredient.name || ingredient.brands.contains(&w.as_str()));
        if hit {
            resolved.ingredients.insert(ingredient.name);
            resolved.classes.extend(ingredient.classes.iter().copied());
        }
    }
    resolved
}

fn ordered<'a>(x: &'a str, y: &'a str) -> (&'a str, &'a str) {
    if x <= y { (x, y) } else { (y, x) }
}

fn drug_drug(meds: &[Resolved<'_>]) -> Vec<DrugInteraction> {
    // One finding per unordered drug pair: the most severe wins
    let mut found: BTreeMap<(String, String), DrugInteraction> = BTreeMap::new();
    let mut record = |a: &str, b: &str, severity: Severity, description: &str, management: &str| {
        let (a, b) = ordered(a, b);
        let key = (a.to_string(), b.to_string());
        let replace = found.get(&key).is_none_or(|existing| severity > existing.severity);
        if replace {
            found.insert(
                key,
                DrugInteraction {
                    drug_a: a.to_string(),
                    drug_b: b.to_string(),
                    severity,
                    description: description.to_string(),
                    management: management.to_string(),
                },
            );
        }
    };

    for (i, x) in meds.iter().enumerate() {
        for y in &meds[i + 1..] {
            if x.ingredients.is_empty() || y.ingredients.is_empty() {
                continue;
            }
            if let Some(shared) = x.ingredients.intersection(&y.ingredients).next() {
                record(
                    x.name,
                    y.name,
                    Severity::Moderate,
                    &format!("Duplicate therapy: both contain {shared}."),
                    "Discontinue one of the duplicate medications.",
                );
                continue;
            }
            for rule in RULES {
                if (x.has(rule.a) && y.has(rule.b)) || (x.has(rule.b) && y.has(rule.a)) {
                    record(x.name, y.name, rule.severity, rule.description, rule.management);
                }
            }
        }
    }

    found.into_values().collect()
}

/// Ingredients and allergenic classes an allergy entry designates
fn allergen_terms(substance: &str) -> BTreeSet<&'static str> {
    let mut terms = BTreeSet::new();
    for w in words(substance) {
        if let Some((_, class)) = CLASS_ALIASES.iter().find(|(alias, _)| *alias == w) {
            terms.insert(*class);
        }
    }
    let resolved = resolve(substance);
    terms.extend(resolved.ingredients.iter().copied());
    terms.extend(
        resolved
            .classes
            .iter()
            .copied()
            .filter(|c| ALLERGENIC_CLASSES.contains(c)),
    );
    terms
}

fn drug_allergy(meds: &[Resolved<'_>], allergies: &[AllergyInput]) -> Vec<AllergyAlert> {
    let mut alerts: BTreeMap<(String, String), AllergyAlert> = BTreeMap::new();
    let mut record = |medication: &str, allergen: &str, severity: Severity, description: String| {
        let key = (medication.to_string(), allergen.to_string());
        if alerts.get(&key).is_none_or(|a| severity > a.severity) {
            alerts.insert(
                key,
                AllergyAlert {
                    medication: medication.to_string(),
                    allergen: allergen.to_string(),
                    severity,
                    description,
                },
            );
        }
    };

    for allergy in allergies {
        let substance = allergy.substance.trim();
        if substance.is_empty() {
            continue;
        }
        let terms = allergen_terms(substance);

        for med in meds {
            if terms.is_empty() {
                // Unknown substance: fall back to a name match
                if mentions(&med.name.to_lowercase(), &substance.to_lowercase()) {
                    record(
                        med.name,
                        substance,
                        Severity::Contraindicated,
                        format!("{} matches documented allergy to {}.", med.name, substance),
                    );
                }
                continue;
            }

            if let Some(term) = terms.iter().find(|t| med.has(t)) {
                record(
                    med.name,
                    substance,
                    Severity::Contraindicated,
                    format!("{} contains or belongs to {} (documented allergy).", med.name, term),
                );
                continue;
            }

            for (from, to, severity) in CROSS_REACTIVE {
                let hit = (terms.contains(from) && med.classes.contains(to))
                    || (terms.contains(to) && med.classes.contains(from));
                if hit {
                    record(
                        med.name,
                        substance,
                        *severity,
                        format!("Possible {from}/{to} cross-reactivity."),
                    );
                }
            }
        }
    }

    alerts.into_values().collect()
}

/// Check a medication list against itself and against documented allergies.
///
/// Output is deduplicated (one finding per unordered drug pair and per
/// medication/allergen pair, the most severe kept) and sorted by severity,
/// most severe first, then by name, so input order does not matter.
pub fn check_all_interactions(
    medications: &[MedicationInput],
    allergies: &[AllergyInput],
) -> InteractionReport {
    let resolved: Vec<Resolved<'_>> = medications
        .iter()
        .filter(|m| !m.name.trim().is_empty())
        .map(|m| resolve(m.name.trim()))
        .collect();

    let mut drug_interactions = drug_drug(&resolved);
    drug_interactions.sort_by(|x, y| {
        y.severity
            .cmp(&x.severity)
            .then_with(|| x.drug_a.cmp(&y.drug_a))
            .then_with(|| x.drug_b.cmp(&y.drug_b))
    });

    let mut allergy_alerts = drug_allergy(&resolved, allergies);
    allergy_alerts.sort_by(|x, y| {
        y.severity
            .cmp(&x.severity)
            .then_with(|| x.medication.cmp(&y.medication))
            .then_with(|| x.allergen.cmp(&y.allergen))
    });

    let mut unrecognized: Vec<String> = resolved
        .iter()
        .filter(|r| r.ingredients.is_empty())
        .map(|r| r.name.to_string())
        .collect();
    unrecognized.sort();
    unrecognized.dedup();

    InteractionReport {
        drug_interactions,
        allergy_alerts,
        unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meds(names: &[&str]) -> Vec<MedicationInput> {
        names
            .iter()
            .map(|n| MedicationInput {
                id: None,
                name: n.to_string(),
            })
            .collect()
    }

    fn allergies(names: &[&str]) -> Vec<AllergyInput> {
        names
            .iter()
            .map(|n| AllergyInput {
                id: None,
                substance: n.to_string(),
            })
            .collect()
    }

    #[test]
    fn finds_class_based_interaction() {
        let report = check_all_interactions(&meds(&["Warfarin 5 MG Oral Tablet", "Ibuprofen 400mg"]), &[]);
        assert_eq!(report.drug_interactions.len(), 1);
        let hit = &report.drug_interactions[0];
        assert_eq!(hit.severity, Severity::Major);
        assert_eq!(hit.drug_a, "Ibuprofen 400mg");
        assert_eq!(hit.drug_b, "Warfarin 5 MG Oral Tablet");
    }

    #[test]
    fn keeps_most_severe_rule_per_pair() {
        // aspirin is both an NSAID and an antiplatelet: both rules fire against warfarin
        let report = check_all_interactions(&meds(&["warfarin", "aspirin"]), &[]);
        assert_eq!(report.drug_interactions.len(), 1);
        assert_eq!(report.drug_interactions[0].severity, Severity::Major);

        // phenelzine + sertraline hits maoi/serotonergic only once, as contraindicated
        let report = check_all_interactions(&meds(&["Nardil", "Zoloft 50 mg"]), &[]);
        assert_eq!(report.drug_interactions.len(), 1);
        assert_eq!(report.drug_interactions[0].severity, Severity::Contraindicated);
    }

    #[test]
    fn output_does_not_depend_on_input_order() {
        let names = ["simvastatin 40mg", "clarithromycin", "lisinopril", "spironolactone", "tylenol"];
        let forward = check_all_interactions(&meds(&names), &allergies(&["Sulfa"]));
        let mut reversed_names = names;
        reversed_names.reverse();
        let backward = check_all_interactions(&meds(&reversed_names), &allergies(&["Sulfa"]));

        assert_eq!(forward, backward);
        assert_eq!(forward.drug_interactions[0].severity, Severity::Contraindicated);
        assert_eq!(forward.drug_interactions[1].severity, Severity::Major);
        assert_eq!(forward.unrecognized, vec!["tylenol"]);
    }

    #[test]
    fn flags_duplicate_therapy_across_brands() {
        let report = check_all_interactions(&meds(&["Coumadin", "warfarin sodium"]), &[]);
        assert_eq!(report.drug_interactions.len(), 1);
        assert_eq!(report.drug_interactions[0].severity, Severity::Moderate);
        assert!(report.drug_interactions[0].description.contains("warfarin"));
    }

    #[test]
    fn same_class_rule_needs_two_drugs() {
        let single = check_all_interactions(&meds(&["amiodarone"]), &[]);
        assert!(single.drug_interactions.is_empty());

        let pair = check_all_interactions(&meds(&["amiodarone", "levofloxacin"]), &[]);
        assert_eq!(pair.drug_interactions.len(), 1);
        assert_eq!(pair.drug_interactions[0].severity, Severity::Major);
    }

    #[test]
    fn allergy_to_class_member_flags_class() {
        let report = check_all_interactions(
            &meds(&["Augmentin 875", "Keflex 500 mg", "metformin"]),
            &allergies(&["Penicillin"]),
        );
        assert_eq!(report.allergy_alerts.len(), 2);
        assert_eq!(report.allergy_alerts[0].medication, "Augmentin 875");
        assert_eq!(report.allergy_alerts[0].severity, Severity::Contraindicated);
        assert_eq!(report.allergy_alerts[1].medication, "Keflex 500 mg");
        assert_eq!(report.allergy_alerts[1].severity, Severity::Moderate);
    }

    #[test]
    fn allergy_class_aliases_and_fallback() {
        let report = check_all_interactions(
            &meds(&["Bactrim DS", "Zinc lozenge"]),
            &allergies(&["Sulfa drugs", "zinc"]),
        );
        let pairs: Vec<(&str, &str)> = report
            .allergy_alerts
            .iter()
            .map(|a| (a.medication.as_str(), a.allergen.as_str()))
            .collect();
        assert_eq!(pairs, vec![("Bactrim DS", "Sulfa drugs"), ("Zinc lozenge", "zinc")]);
    }

    #[test]
    fn empty_inputs_give_empty_report() {
        assert_eq!(check_all_interactions(&[], &[]), InteractionReport::default());
        let blank = check_all_interactions(&meds(&["  "]), &allergies(&[""]));
        assert_eq!(blank, InteractionReport::default());
    }
}
