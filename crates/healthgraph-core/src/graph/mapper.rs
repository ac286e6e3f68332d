//! Clinical code to body-system mapping.
//!
//! Pure lookups over static tables. Every code resolves to something:
//! exact match first, then the 3-character category prefix, then
//! [`BodySystem::Unknown`].
//!
//! Note that the prefix fallback can place a code under an unrelated
//! category that happens to share its first three characters.

use super::models::BodySystem;

/// Number of leading characters forming a code's category.
pub const CATEGORY_PREFIX_LEN: usize = 3;

/// Subsystem label used for unmapped conditions.
pub const UNKNOWN_SUBSYSTEM: &str = "Unknown";

/// Action label used for unmapped medications.
pub const UNKNOWN_ACTION: &str = "Helps with treatment";

/// How a code was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Prefix,
    Unmapped,
}

/// Where a condition code lands in the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionMapping {
    pub system: BodySystem,
    pub subsystem: &'static str,
    pub matched: MatchKind,
}

/// What a medication code acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MedicationTarget {
    pub target: BodySystem,
    pub action: &'static str,
    pub matched: MatchKind,
}

// ICD-10 condition categories.
const CONDITION_TABLE: &[(&str, BodySystem, &str)] = &[
    // Cardiovascular
    ("I10", BodySystem::Heart, "Blood Vessels"),
    ("I11", BodySystem::Heart, "Muscle"),
    ("I13", BodySystem::Heart, "Muscle"),
    ("I20", BodySystem::Heart, "Coronary Arteries"),
    ("I21", BodySystem::Heart, "Coronary Arteries"),
    ("I25", BodySystem::Heart, "Coronary Arteries"),
    ("I48", BodySystem::Heart, "Electrical System"),
    ("I50", BodySystem::Heart, "Muscle"),
    ("I63", BodySystem::Brain, "Blood Vessels"),
    ("I70", BodySystem::BloodVessels, "Arteries"),
    // Metabolic / endocrine
    ("E10", BodySystem::Pancreas, "Insulin Production"),
    ("E11", BodySystem::Pancreas, "Insulin Production"),
    ("E13", BodySystem::Pancreas, "Insulin Production"),
    ("E66", BodySystem::Metabolism, "Energy Balance"),
    ("E78", BodySystem::Liver, "Cholesterol Processing"),
    ("E03", BodySystem::Thyroid, "Hormone Production"),
    ("E05", BodySystem::Thyroid, "Hormone Production"),
    // Respiratory
    ("J44", BodySystem::Lungs, "Airways"),
    ("J45", BodySystem::Lungs, "Airways"),
    ("J18", BodySystem::Lungs, "Air Sacs"),
    ("J06", BodySystem::Lungs, "Upper Airways"),
    // Neurological
    ("G20", BodySystem::Brain, "Motor Control"),
    ("G30", BodySystem::Brain, "Memory"),
    ("G40", BodySystem::Brain, "Electrical Activity"),
    ("G43", BodySystem::Brain, "Blood Vessels"),
    ("G47", BodySystem::Brain, "Sleep Centers"),
    // Musculoskeletal
    ("M54", BodySystem::Spine, "Vertebrae"),
    ("M17", BodySystem::Joints, "Knees"),
    ("M16", BodySystem::Joints, "Hips"),
    ("M79", BodySystem::Muscles, "Soft Tissue"),
    ("M81", BodySystem::Bones, "Density"),
    // Mental health
    ("F32", BodySystem::Brain, "Mood Centers"),
    ("F33", BodySystem::Brain, "Mood Centers"),
    ("F41", BodySystem::Brain, "Stress Response"),
    ("F17", BodySystem::Brain, "Reward Centers"),
    // Digestive
    ("K21", BodySystem::Stomach, "Acid Production"),
    ("K50", BodySystem::Intestines, "Large Intestine"),
    ("K51", BodySystem::Intestines, "Large Intestine"),
    ("K70", BodySystem::Liver, "Cells"),
    ("K76", BodySystem::Liver, "Cells"),
    // Kidney / urinary
    ("N18", BodySystem::Kidneys, "Filtering"),
    ("N17", BodySystem::Kidneys, "Filtering"),
    ("N40", BodySystem::Prostate, "Gland"),
    // Eyes
    ("H36", BodySystem::Eyes, "Blood Vessels"),
    ("H35", BodySystem::Eyes, "Retina"),
    ("H40", BodySystem::Eyes, "Pressure"),
    ("H25", BodySystem::Eyes, "Lens"),
    // Oncology
    ("C34", BodySystem::Lungs, "Tissue"),
    ("C50", BodySystem::Breast, "Tissue"),
    ("C61", BodySystem::Prostate, "Gland"),
    ("C18", BodySystem::Intestines, "Large Intestine"),
];

// ATC medication codes, with 3-character therapeutic groups as fallbacks.
const MEDICATION_TABLE: &[(&str, BodySystem, &str)] = &[
    // Blood thinners
    ("B01AA03", BodySystem::Blood, "Prevents clotting"), // warfarin
    ("B01AF01", BodySystem::Blood, "Prevents clotting"), // rivaroxaban
    ("B01AF02", BodySystem::Blood, "Prevents clotting"), // apixaban
    ("B01AC06", BodySystem::Blood, "Prevents clotting"), // aspirin
    ("B01", BodySystem::Blood, "Prevents clotting"),
    // Diabetes
    ("A10BA02", BodySystem::Liver, "Reduces glucose production"), // metformin
    ("A10AB01", BodySystem::BodyCells, "Enables glucose uptake"), // regular insulin
    ("A10AE04", BodySystem::BodyCells, "Enables glucose uptake"), // insulin glargine
    ("A10BK01", BodySystem::Kidneys, "Removes excess glucose"),   // empagliflozin
    ("A10BJ02", BodySystem::Pancreas, "Stimulates insulin release"), // liraglutide
    ("A10", BodySystem::Pancreas, "Lowers blood sugar"),
    // Heart
    ("C07AB02", BodySystem::Heart, "Slows heart rate"), // metoprolol
    ("C07AB03", BodySystem::Heart, "Slows heart rate"), // atenolol
    ("C07", BodySystem::Heart, "Slows heart rate"),
    ("C09AA02", BodySystem::BloodVessels, "Relaxes vessels"), // enalapril
    ("C09AA03", BodySystem::BloodVessels, "Relaxes vessels"), // lisinopril
    ("C09CA01", BodySystem::BloodVessels, "Relaxes vessels"), // losartan
    ("C09", BodySystem::BloodVessels, "Relaxes vessels"),
    ("C03CA01", BodySystem::Kidneys, "Removes excess fluid"), // furosemide
    ("C03AA03", BodySystem::Kidneys, "Removes excess fluid"), // hydrochlorothiazide
    ("C03", BodySystem::Kidneys, "Removes excess fluid"),
    ("C08CA01", BodySystem::BloodVessels, "Relaxes vessels"), // amlodipine
    ("C01BD01", BodySystem::Heart, "Regulates rhythm"),       // amiodarone
    // Cholesterol
    ("C10AA01", BodySystem::Liver, "Reduces cholesterol production"), // simvastatin
    ("C10AA05", BodySystem::Liver, "Reduces cholesterol production"), // atorvastatin
    ("C10AA07", BodySystem::Liver, "Reduces cholesterol production"), // rosuvastatin
    ("C10", BodySystem::Liver, "Reduces cholesterol production"),
    // Respiratory
    ("R03AC02", BodySystem::Lungs, "Opens airways"), // salbutamol
    ("R03AK06", BodySystem::Lungs, "Opens airways, reduces inflammation"), // fluticasone/salmeterol
    ("R03BB04", BodySystem::Lungs, "Opens airways"), // tiotropium
    ("R03", BodySystem::Lungs, "Opens airways"),
    // Pain / inflammation
    ("N02BE01", BodySystem::Brain, "Reduces pain signals"), // paracetamol
    ("N02AX02", BodySystem::Brain, "Reduces pain signals"), // tramadol
    ("N02", BodySystem::Brain, "Reduces pain signals"),
    ("M01AE01", BodySystem::Body, "Reduces inflammation"), // ibuprofen
    ("M01", BodySystem::Body, "Reduces inflammation"),
    // Mental health
    ("N06AB06", BodySystem::Brain, "Balances mood chemicals"), // sertraline
    ("N06AB04", BodySystem::Brain, "Balances mood chemicals"), // citalopram
    ("N06AB10", BodySystem::Brain, "Balances mood chemicals"), // escitalopram
    ("N06", BodySystem::Brain, "Balances mood chemicals"),
    ("N05AH04", BodySystem::Brain, "Balances brain chemicals"), // quetiapine
    // Thyroid
    ("H03AA01", BodySystem::Thyroid, "Replaces thyroid hormone"), // levothyroxine
    ("H03", BodySystem::Thyroid, "Adjusts thyroid hormone"),
    // Stomach
    ("A02BC01", BodySystem::Stomach, "Reduces acid production"), // omeprazole
    ("A02BC02", BodySystem::Stomach, "Reduces acid production"), // pantoprazole
    ("A02", BodySystem::Stomach, "Reduces acid production"),
];

// Comorbidity associations between ICD-10 categories.
const COMORBIDITY_TABLE: &[(&str, &[&str])] = &[
    ("E10", &["H36", "N18", "I10"]),
    ("E11", &["I10", "N18", "H36", "E78", "I25"]),
    ("E66", &["E11", "I10", "G47", "M17"]),
    ("E78", &["I25", "I63"]),
    ("I10", &["N18", "I25", "I50", "I63"]),
    ("I25", &["I50", "I48"]),
    ("I48", &["I63"]),
    ("J44", &["I50", "F17"]),
    ("F32", &["F41", "G47"]),
    ("K70", &["K76"]),
];

/// Normalize a code for lookup.
fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// The first [`CATEGORY_PREFIX_LEN`] characters of a code (or all of it).
pub fn category_prefix(code: &str) -> &str {
    match code.char_indices().nth(CATEGORY_PREFIX_LEN) {
        Some((idx, _)) => &code[..idx],
        None => code,
    }
}

/// Exact lookup, then category prefix.
fn lookup<'a>(
    table: &'a [(&'static str, BodySystem, &'static str)],
    code: &str,
) -> Option<(&'a (&'static str, BodySystem, &'static str), MatchKind)> {
    let code = normalize(code);
    if let Some(entry) = table.iter().find(|(key, _, _)| *key == code) {
        return Some((entry, MatchKind::Exact));
    }
    let prefix = category_prefix(&code);
    table
        .iter()
        .find(|(key, _, _)| *key == prefix)
        .map(|entry| (entry, MatchKind::Prefix))
}

/// Map a condition code to the body system it affects.
pub fn map_condition_code(code: &str) -> ConditionMapping {
    match lookup(CONDITION_TABLE, code) {
        Some((&(_, system, subsystem), matched)) => ConditionMapping {
            system,
            subsystem,
            matched,
        },
        None => ConditionMapping {
            system: BodySystem::Unknown,
            subsystem: UNKNOWN_SUBSYSTEM,
            matched: MatchKind::Unmapped,
        },
    }
}

/// Map a medication code to the body system it targets.
pub fn map_medication_code(code: &str) -> MedicationTarget {
    match lookup(MEDICATION_TABLE, code) {
        Some((&(_, target, action), matched)) => MedicationTarget {
            target,
            action,
            matched,
        },
        None => MedicationTarget {
            target: BodySystem::Unknown,
            action: UNKNOWN_ACTION,
            matched: MatchKind::Unmapped,
        },
    }
}

/// ICD-10 categories clinically associated with the category of `code`.
pub fn related_condition_categories(code: &str) -> &'static [&'static str] {
    let code = normalize(code);
    let prefix = category_prefix(&code);
    COMORBIDITY_TABLE
        .iter()
        .find(|(key, _)| *key == prefix)
        .map(|(_, related)| *related)
        .unwrap_or(&[])
}

/// True when `related` falls in a category associated with `code`.
pub fn is_comorbidity(code: &str, related: &str) -> bool {
    let related = normalize(related);
    let related_prefix = category_prefix(&related);
    related_condition_categories(code).contains(&related_prefix)
}
