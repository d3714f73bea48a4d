use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::requirements::{DocumentError, RequirementsDocument};
use crate::flows::capabilities::{Classification, ConfirmationClassifier, SpecExtractor};
use crate::flows::states::{DialoguePhase, DialogueState, TurnNotice, TurnOutcome, Utterance};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogueError {
    #[error("dialogue cannot accept a turn in phase {phase:?}")]
    InvalidStateTransition { phase: DialoguePhase },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Deterministic dialogue that collects structure requirements, emits them once
/// and waits for an explicit confirmation.
pub struct DialogueEngine<C, X> {
    classifier: C,
    extractor: X,
}

impl<C, X> DialogueEngine<C, X>
where
    C: ConfirmationClassifier,
    X: SpecExtractor,
{
    pub fn new(classifier: C, extractor: X) -> Self {
        Self { classifier, extractor }
    }

    pub fn initial_state(&self) -> DialogueState {
        DialogueState::default()
    }

    pub fn step(&self, state: &DialogueState, message: &str) -> Result<TurnOutcome, DialogueError> {
        match state.phase {
            DialoguePhase::Terminated => {
                Err(DialogueError::InvalidStateTransition { phase: state.phase })
            }
            DialoguePhase::AwaitingConfirmation | DialoguePhase::Editing => {
                self.step_confirming(state, message)
            }
            DialoguePhase::Collecting => self.step_collecting(state, message),
        }
    }

    pub fn step_with_audit<S>(
        &self,
        state: &DialogueState,
        message: &str,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TurnOutcome, DialogueError>
    where
        S: AuditSink,
    {
        let result = self.step(state, message);
        match &result {
            Ok(outcome) => {
                let ambiguous = outcome.notices.contains(&TurnNotice::AmbiguousClassification);
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.thread_id.clone(),
                        audit.correlation_id.clone(),
                        "dialogue.turn_applied",
                        AuditCategory::Dialogue,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", outcome.from.as_str())
                    .with_metadata("to", outcome.state.phase.as_str())
                    .with_metadata("utterance", outcome.utterance.kind())
                    .with_metadata("ambiguous_classification", ambiguous.to_string()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.thread_id.clone(),
                        audit.correlation_id.clone(),
                        "dialogue.turn_rejected",
                        AuditCategory::Dialogue,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("from", state.phase.as_str())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    fn step_confirming(
        &self,
        state: &DialogueState,
        message: &str,
    ) -> Result<TurnOutcome, DialogueError> {
        let report = self.classifier.classify(message);
        let mut notices = Vec::new();
        if report.is_ambiguous() {
            notices.push(TurnNotice::AmbiguousClassification);
        }

        let mut next = state.clone();
        let utterance = match report.classification {
            Classification::Confirmation => {
                next.phase = DialoguePhase::Terminated;
                Utterance::Completed
            }
            Classification::Denial => Utterance::Refusal,
            Classification::Neither => {
                let extraction = self.extractor.extract(message, &state.requirements);
                notices.extend(extraction.malformed.iter().copied().map(TurnNotice::MalformedSpecInput));
                if extraction.updated.is_empty() {
                    Utterance::ChangePrompt
                } else {
                    let document = RequirementsDocument::from_requirements(&extraction.requirements)?;
                    next.requirements = extraction.requirements;
                    next.phase = DialoguePhase::Editing;
                    Utterance::Document(document)
                }
            }
        };

        Ok(TurnOutcome {
            from: state.phase,
            state: next,
            utterance,
            classification: Some(report.classification),
            notices,
        })
    }

    fn step_collecting(
        &self,
        state: &DialogueState,
        message: &str,
    ) -> Result<TurnOutcome, DialogueError> {
        let extraction = self.extractor.extract(message, &state.requirements);
        let notices =
            extraction.malformed.iter().copied().map(TurnNotice::MalformedSpecInput).collect();
        let missing_fields = extraction.missing_fields();

        let mut next = DialogueState { phase: state.phase, requirements: extraction.requirements };
        let utterance = if missing_fields.is_empty() {
            let document = RequirementsDocument::from_requirements(&next.requirements)?;
            next.phase = DialoguePhase::AwaitingConfirmation;
            Utterance::Document(document)
        } else {
            Utterance::MissingFields(missing_fields)
        };

        Ok(TurnOutcome { from: state.phase, state: next, utterance, classification: None, notices })
    }
}
