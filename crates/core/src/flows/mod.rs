pub mod capabilities;
pub mod engine;
pub mod states;

pub use capabilities::{
    Classification, ClassificationReport, ConfirmationClassifier, Extraction, SpecExtractor,
};
pub use engine::{DialogueEngine, DialogueError};
pub use states::{
    DialoguePhase, DialogueState, TurnNotice, TurnOutcome, Utterance, CHANGE_PROMPT,
    COMPLETED_SENTINEL, PROCEED_QUESTION, REFUSAL_MESSAGE,
};
