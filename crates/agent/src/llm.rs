//! Wire types and the client seam for the hosted agents service.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentApiError {
    #[error("agents service request failed: {0}")]
    Transport(String),
    #[error("agents service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("agents service response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }

    /// Statuses the run can still leave on its own; polling continues.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStepSummary {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub step_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextValue {
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: TextValue,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    pub fn is_from_agent(&self) -> bool {
        matches!(self.role.as_str(), "assistant" | "agent")
    }

    pub fn text_blocks(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|content| match content {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Other => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewAgent<'a> {
    pub model: &'a str,
    pub name: &'a str,
    pub instructions: &'a str,
}

/// Operations the runner needs from the hosted agents service.
#[async_trait]
pub trait AgentsApi: Send + Sync {
    async fn create_agent(&self, agent: NewAgent<'_>) -> Result<AgentRecord, AgentApiError>;
    async fn create_thread(&self) -> Result<ThreadRecord, AgentApiError>;
    async fn post_user_message(&self, thread_id: &str, content: &str) -> Result<(), AgentApiError>;
    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<RunRecord, AgentApiError>;
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunRecord, AgentApiError>;
    /// Messages of a thread in ascending creation order.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AgentApiError>;
    async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Vec<RunStepSummary>, AgentApiError>;
}
