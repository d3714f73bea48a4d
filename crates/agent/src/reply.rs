use structure_agent_core::domain::requirements::{DocumentError, RequirementsDocument};
use structure_agent_core::flows::COMPLETED_SENTINEL;
use tracing::warn;

/// What a relayed agent reply says about the dialogue.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplyInspection {
    pub done: bool,
    pub structure_requirements: Option<RequirementsDocument>,
}

pub fn inspect_reply(reply: &str, correlation_id: &str) -> ReplyInspection {
    let structure_requirements = match RequirementsDocument::find_in(reply) {
        Ok(document) => Some(document),
        Err(DocumentError::NotFound) => None,
        Err(error) => {
            warn!(
                event_name = "upstream.reply.shape_violation",
                correlation_id,
                error = %error,
                "agent reply embeds JSON that is not a requirements document"
            );
            None
        }
    };

    ReplyInspection { done: reply.trim() == COMPLETED_SENTINEL, structure_requirements }
}
