use thiserror::Error;

use crate::flows::DialogueError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Dialogue(#[from] DialogueError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingConfiguration(Vec<String>),
    #[error("upstream agent timed out with status `{status}`")]
    UpstreamTimeout { status: String },
    #[error("upstream agent run requires action with status `{status}`")]
    UpstreamRequiresAction { status: String },
    #[error("upstream agent request failed: {0}")]
    UpstreamRequest(String),
    #[error("upstream agent failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("missing configuration: {}", .missing.join(", "))]
    MissingConfiguration { missing: Vec<String>, correlation_id: String },
    #[error("upstream timeout: {message}")]
    UpstreamTimeout { message: String, correlation_id: String },
    #[error("upstream unsupported: {message}")]
    UpstreamUnsupported { message: String, correlation_id: String },
    #[error("upstream failure: {message}")]
    UpstreamFailure { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Conflict { .. } => "This conversation has already completed.",
            Self::MissingConfiguration { .. } => "Missing required environment variables.",
            Self::UpstreamTimeout { .. } => "Agent run timed out",
            Self::UpstreamUnsupported { .. } => {
                "Run requires action (tools/functions not supported)"
            }
            Self::UpstreamFailure { .. } => "Run did not complete successfully",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn status_class(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::Conflict { .. } => "conflict",
            Self::MissingConfiguration { .. } => "missing_configuration",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::UpstreamUnsupported { .. } => "requires_action",
            Self::UpstreamFailure { .. } => "upstream_failure",
            Self::Internal { .. } => "unexpected",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::MissingConfiguration { correlation_id, .. }
            | Self::UpstreamTimeout { correlation_id, .. }
            | Self::UpstreamUnsupported { correlation_id, .. }
            | Self::UpstreamFailure { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::MissingConfiguration { correlation_id: id, .. }
            | InterfaceError::UpstreamTimeout { correlation_id: id, .. }
            | InterfaceError::UpstreamUnsupported { correlation_id: id, .. }
            | InterfaceError::UpstreamFailure { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::Dialogue(
                error @ DialogueError::InvalidStateTransition { .. },
            )) => Self::Conflict { message: error.to_string(), correlation_id },
            ApplicationError::Domain(DomainError::Dialogue(DialogueError::Document(error))) => {
                Self::Internal { message: error.to_string(), correlation_id }
            }
            ApplicationError::Domain(DomainError::InvariantViolation(message)) => {
                Self::Internal { message, correlation_id }
            }
            ApplicationError::InvalidRequest(message) => Self::BadRequest { message, correlation_id },
            ApplicationError::MissingConfiguration(missing) => {
                Self::MissingConfiguration { missing, correlation_id }
            }
            ApplicationError::UpstreamTimeout { status } => {
                Self::UpstreamTimeout { message: format!("run status `{status}`"), correlation_id }
            }
            ApplicationError::UpstreamRequiresAction { status } => Self::UpstreamUnsupported {
                message: format!("run status `{status}`"),
                correlation_id,
            },
            ApplicationError::UpstreamRequest(message) => Self::Internal { message, correlation_id },
            ApplicationError::Integration(message) => {
                Self::UpstreamFailure { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::flows::{DialogueError, DialoguePhase};

    #[test]
    fn terminated_dialogue_maps_to_conflict() {
        let interface = ApplicationError::from(DomainError::from(
            DialogueError::InvalidStateTransition { phase: DialoguePhase::Terminated },
        ))
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::Conflict {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(interface.status_class(), "conflict");
    }

    #[test]
    fn invalid_request_has_user_safe_message() {
        let interface =
            ApplicationError::InvalidRequest("missing prompt".to_owned()).into_interface("req-2");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn missing_configuration_keeps_variable_names() {
        let interface = ApplicationError::MissingConfiguration(vec![
            "PROJECT_ENDPOINT".to_owned(),
            "MODEL_DEPLOYMENT_NAME".to_owned(),
        ])
        .into_interface("req-3");

        assert_eq!(interface.status_class(), "missing_configuration");
        assert_eq!(
            interface.to_string(),
            "missing configuration: PROJECT_ENDPOINT, MODEL_DEPLOYMENT_NAME"
        );
    }

    #[test]
    fn upstream_errors_stay_distinct() {
        let timeout = ApplicationError::UpstreamTimeout { status: "in_progress".to_owned() }
            .into_interface("req-4");
        let failure =
            ApplicationError::Integration("run failed".to_owned()).into_interface("req-4");

        assert_eq!(timeout.status_class(), "upstream_timeout");
        assert_eq!(failure.status_class(), "upstream_failure");
        assert_eq!(timeout.correlation_id(), "req-4");
    }

    #[test]
    fn requires_action_has_its_own_class() {
        let interface =
            ApplicationError::UpstreamRequiresAction { status: "requires_action".to_owned() }
                .into_interface("req-6");

        assert_eq!(interface.status_class(), "requires_action");
        assert!(matches!(interface, InterfaceError::UpstreamUnsupported { .. }));
    }

    #[test]
    fn configuration_error_maps_to_unexpected() {
        let interface =
            ApplicationError::Configuration("bad log level".to_owned()).into_interface("req-5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
