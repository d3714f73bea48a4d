use serde::{Deserialize, Serialize};

use crate::domain::requirements::{
    DocumentError, RequirementsDocument, SpecField, StructureRequirements,
};
use crate::flows::capabilities::Classification;

pub const PROCEED_QUESTION: &str =
    "Would you like me to proceed with running the job to create this structure?";
pub const COMPLETED_SENTINEL: &str = "completed job";
pub const REFUSAL_MESSAGE: &str =
    "Understood, I won't run the job yet. What would you like to change?";
pub const CHANGE_PROMPT: &str = "What would you like to change?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialoguePhase {
    Collecting,
    AwaitingConfirmation,
    Editing,
    Terminated,
}

impl DialoguePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Editing => "editing",
            Self::Terminated => "terminated",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DialogueState {
    pub phase: DialoguePhase,
    pub requirements: StructureRequirements,
}

impl Default for DialogueState {
    fn default() -> Self {
        Self { phase: DialoguePhase::Collecting, requirements: StructureRequirements::default() }
    }
}

impl DialogueState {
    /// True once the document has been emitted; never reverts.
    pub fn json_emitted(&self) -> bool {
        !matches!(self.phase, DialoguePhase::Collecting)
    }

    pub fn awaiting_confirmation(&self) -> bool {
        matches!(self.phase, DialoguePhase::AwaitingConfirmation | DialoguePhase::Editing)
    }

    pub fn terminated(&self) -> bool {
        matches!(self.phase, DialoguePhase::Terminated)
    }
}

/// What the agent says at the end of a turn.
#[derive(Clone, Debug, PartialEq)]
pub enum Utterance {
    MissingFields(Vec<SpecField>),
    Document(RequirementsDocument),
    Refusal,
    ChangePrompt,
    Completed,
}

impl Utterance {
    pub fn text(&self) -> Result<String, DocumentError> {
        Ok(match self {
            Self::MissingFields(fields) => {
                fields.iter().map(SpecField::prompt).collect::<Vec<_>>().join(" ")
            }
            Self::Document(document) => format!("{}\n\n{PROCEED_QUESTION}", document.render()?),
            Self::Refusal => REFUSAL_MESSAGE.to_string(),
            Self::ChangePrompt => CHANGE_PROMPT.to_string(),
            Self::Completed => COMPLETED_SENTINEL.to_string(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingFields(_) => "missing_fields",
            Self::Document(_) => "document",
            Self::Refusal => "refusal",
            Self::ChangePrompt => "change_prompt",
            Self::Completed => "completed",
        }
    }
}

/// Conditions worth recording that do not interrupt the turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnNotice {
    AmbiguousClassification,
    MalformedSpecInput(SpecField),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub from: DialoguePhase,
    pub state: DialogueState,
    pub utterance: Utterance,
    pub classification: Option<Classification>,
    pub notices: Vec<TurnNotice>,
}

impl TurnOutcome {
    pub fn done(&self) -> bool {
        self.state.terminated()
    }
}
