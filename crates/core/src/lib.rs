pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use domain::requirements::{
    DocumentError, Measure, RequirementsDocument, SpecField, StructureRequirements,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    Classification, ClassificationReport, ConfirmationClassifier, DialogueEngine, DialogueError,
    DialoguePhase, DialogueState, Extraction, SpecExtractor, TurnNotice, TurnOutcome, Utterance,
};
