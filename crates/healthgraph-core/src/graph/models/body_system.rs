//! The fixed body-system taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Anatomical category a condition affects or a medication targets.
///
/// The set is closed: every AFFECTS and TARGETS edge points at one of these,
/// with [`BodySystem::Unknown`] absorbing codes the mapper cannot place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BodySystem {
    Heart,
    Brain,
    BloodVessels,
    Pancreas,
    Metabolism,
    Liver,
    Thyroid,
    Lungs,
    Spine,
    Joints,
    Muscles,
    Bones,
    Stomach,
    Intestines,
    Kidneys,
    Prostate,
    Eyes,
    Breast,
    Blood,
    BodyCells,
    Body,
    Unknown,
}

impl BodySystem {
    /// Every body system, in seeding order.
    pub const ALL: [BodySystem; 22] = [
        BodySystem::Heart,
        BodySystem::Brain,
        BodySystem::BloodVessels,
        BodySystem::Pancreas,
        BodySystem::Metabolism,
        BodySystem::Liver,
        BodySystem::Thyroid,
        BodySystem::Lungs,
        BodySystem::Spine,
        BodySystem::Joints,
        BodySystem::Muscles,
        BodySystem::Bones,
        BodySystem::Stomach,
        BodySystem::Intestines,
        BodySystem::Kidneys,
        BodySystem::Prostate,
        BodySystem::Eyes,
        BodySystem::Breast,
        BodySystem::Blood,
        BodySystem::BodyCells,
        BodySystem::Body,
        BodySystem::Unknown,
    ];

    /// Node key used in the graph.
    pub fn name(&self) -> &'static str {
        match self {
            BodySystem::Heart => "Heart",
            BodySystem::Brain => "Brain",
            BodySystem::BloodVessels => "Blood Vessels",
            BodySystem::Pancreas => "Pancreas",
            BodySystem::Metabolism => "Metabolism",
            BodySystem::Liver => "Liver",
            BodySystem::Thyroid => "Thyroid",
            BodySystem::Lungs => "Lungs",
            BodySystem::Spine => "Spine",
            BodySystem::Joints => "Joints",
            BodySystem::Muscles => "Muscles",
            BodySystem::Bones => "Bones",
            BodySystem::Stomach => "Stomach",
            BodySystem::Intestines => "Intestines",
            BodySystem::Kidneys => "Kidneys",
            BodySystem::Prostate => "Prostate",
            BodySystem::Eyes => "Eyes",
            BodySystem::Breast => "Breast",
            BodySystem::Blood => "Blood",
            BodySystem::BodyCells => "Body Cells",
            BodySystem::Body => "Body",
            BodySystem::Unknown => "Unknown",
        }
    }

    /// Plain-language description shown to patients.
    pub fn description(&self) -> &'static str {
        match self {
            BodySystem::Heart => "Pumps blood throughout your body",
            BodySystem::Brain => "Controls all body functions",
            BodySystem::BloodVessels => "Carry blood throughout the body",
            BodySystem::Pancreas => "Produces insulin to control blood sugar",
            BodySystem::Metabolism => "Converts food into energy",
            BodySystem::Liver => "Processes nutrients and removes toxins",
            BodySystem::Thyroid => "Regulates metabolism",
            BodySystem::Lungs => "Brings oxygen into your body",
            BodySystem::Spine => "Supports your body and protects nerves",
            BodySystem::Joints => "Allow movement",
            BodySystem::Muscles => "Enable movement",
            BodySystem::Bones => "Support and protect your body",
            BodySystem::Stomach => "Digests food",
            BodySystem::Intestines => "Absorb nutrients",
            BodySystem::Kidneys => "Filter waste from your blood",
            BodySystem::Prostate => "Part of the urinary and reproductive systems",
            BodySystem::Eyes => "Enable vision",
            BodySystem::Breast => "Mammary glands",
            BodySystem::Blood => "Carries oxygen and helps wounds heal",
            BodySystem::BodyCells => "Use sugar from the blood for energy",
            BodySystem::Body => "Your whole body",
            BodySystem::Unknown => "Part of your body",
        }
    }

    /// Look up a body system by its node key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

impl fmt::Display for BodySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
