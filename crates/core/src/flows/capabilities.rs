use serde::{Deserialize, Serialize};

use crate::domain::requirements::{SpecField, StructureRequirements};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Confirmation,
    Denial,
    Neither,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classification: Classification,
    pub matched_confirmation: bool,
    pub matched_denial: bool,
}

impl ClassificationReport {
    /// Resolves raw matches; denial wins when both vocabularies matched.
    pub fn from_matches(matched_confirmation: bool, matched_denial: bool) -> Self {
        let classification = if matched_denial {
            Classification::Denial
        } else if matched_confirmation {
            Classification::Confirmation
        } else {
            Classification::Neither
        };
        Self { classification, matched_confirmation, matched_denial }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.matched_confirmation && self.matched_denial
    }
}

/// Decides whether a message confirms, denies, or does neither.
pub trait ConfirmationClassifier {
    fn classify(&self, message: &str) -> ClassificationReport;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub requirements: StructureRequirements,
    /// Fields the message explicitly specified, in `SpecField::ALL` order.
    pub updated: Vec<SpecField>,
    /// Fields the message tried to specify with an unusable value.
    pub malformed: Vec<SpecField>,
}

impl Extraction {
    pub fn unchanged(current: &StructureRequirements) -> Self {
        Self { requirements: current.clone(), ..Self::default() }
    }

    pub fn missing_fields(&self) -> Vec<SpecField> {
        self.requirements.missing_fields()
    }
}

/// Recognizes structure requirements in a single message.
///
/// Fields the message does not address keep their value from `current`, and a
/// field is only written when its whole value parsed.
pub trait SpecExtractor {
    fn extract(&self, message: &str, current: &StructureRequirements) -> Extraction;
}
