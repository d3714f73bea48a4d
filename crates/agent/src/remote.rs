use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use structure_agent_core::config::{
    AgentServiceConfig, MODEL_DEPLOYMENT_NAME_VAR, PROJECT_ENDPOINT_VAR,
};
use structure_agent_core::errors::ApplicationError;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::instructions::{STRUCTURE_AGENT_INSTRUCTIONS, STRUCTURE_AGENT_NAME};
use crate::llm::{
    AgentApiError, AgentRecord, AgentsApi, NewAgent, RunRecord, RunStatus, RunStepSummary,
    ThreadMessage, ThreadRecord,
};

pub const NO_RESPONSE_CONTENT: &str = "(no response content)";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunStepsDiagnostic {
    Steps(Vec<RunStepSummary>),
    Unavailable { run_steps_error: String },
}

#[derive(Debug, Error)]
pub enum AgentRunError {
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingConfiguration(Vec<&'static str>),
    #[error("agent run timed out with status `{status}`")]
    Timeout { status: RunStatus },
    #[error("agent run requires action, which is not supported")]
    RequiresAction { status: RunStatus },
    #[error("agent run `{run_id}` finished with status `{status}`")]
    RunNotCompleted {
        status: RunStatus,
        run_id: String,
        last_error: Option<Value>,
        run_steps: Option<RunStepsDiagnostic>,
    },
    #[error(transparent)]
    Api(#[from] AgentApiError),
}

impl AgentRunError {
    pub fn status_class(&self) -> &'static str {
        match self {
            Self::MissingConfiguration(_) => "missing_configuration",
            Self::Timeout { .. } => "upstream_timeout",
            Self::RequiresAction { .. } => "requires_action",
            Self::RunNotCompleted { .. } => "upstream_failure",
            Self::Api(_) => "unexpected",
        }
    }
}

impl From<AgentRunError> for ApplicationError {
    fn from(error: AgentRunError) -> Self {
        match error {
            AgentRunError::MissingConfiguration(missing) => {
                Self::MissingConfiguration(missing.into_iter().map(str::to_string).collect())
            }
            AgentRunError::Timeout { status } => Self::UpstreamTimeout { status: status.to_string() },
            AgentRunError::RequiresAction { status } => {
                Self::UpstreamRequiresAction { status: status.to_string() }
            }
            error @ AgentRunError::RunNotCompleted { .. } => Self::Integration(error.to_string()),
            AgentRunError::Api(error) => Self::UpstreamRequest(error.to_string()),
        }
    }
}

/// Everything a forwarded prompt needs, resolved once from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentRunSettings {
    pub model_deployment_name: String,
    pub agent_id: Option<String>,
    pub run_timeout: Duration,
    pub poll_interval: Duration,
}

impl AgentRunSettings {
    pub fn from_config(config: &AgentServiceConfig) -> Result<Self, AgentRunError> {
        let missing = config.missing_required();
        if !missing.is_empty() {
            return Err(AgentRunError::MissingConfiguration(missing));
        }
        let model_deployment_name = config
            .model_deployment_name
            .clone()
            .ok_or(AgentRunError::MissingConfiguration(vec![MODEL_DEPLOYMENT_NAME_VAR]))?;

        Ok(Self {
            model_deployment_name,
            agent_id: config.agent_id.clone().filter(|id| !id.trim().is_empty()),
            run_timeout: Duration::from_secs(config.run_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentReply {
    pub response: String,
    pub run_status: RunStatus,
    pub agent_id: String,
    pub thread_id: String,
    pub run_id: String,
}

/// Forwards one prompt to the hosted agent and waits for its reply.
pub struct AgentRunner<A> {
    api: A,
    settings: AgentRunSettings,
}

impl<A> AgentRunner<A>
where
    A: AgentsApi,
{
    pub fn new(api: A, settings: AgentRunSettings) -> Self {
        Self { api, settings }
    }

    pub async fn run_prompt(
        &self,
        prompt: &str,
        correlation_id: &str,
        debug: bool,
    ) -> Result<AgentReply, AgentRunError> {
        let agent_id = self.resolve_agent().await?;
        let thread = self.api.create_thread().await?;
        self.api.post_user_message(&thread.id, prompt).await?;
        let run = self.api.create_run(&thread.id, &agent_id).await?;

        info!(
            event_name = "upstream.run.started",
            correlation_id,
            thread_id = %thread.id,
            run_id = %run.id,
            agent_id = %agent_id,
            "agent run started"
        );

        let run = self.await_completion(&thread, run, debug).await?;
        let response = self.last_agent_text(&thread.id).await?;

        info!(
            event_name = "upstream.run.completed",
            correlation_id,
            thread_id = %thread.id,
            run_id = %run.id,
            "agent run completed"
        );

        Ok(AgentReply {
            response,
            run_status: run.status,
            agent_id,
            thread_id: thread.id,
            run_id: run.id,
        })
    }

    async fn resolve_agent(&self) -> Result<String, AgentRunError> {
        if let Some(agent_id) = &self.settings.agent_id {
            return Ok(agent_id.clone());
        }

        let AgentRecord { id } = self
            .api
            .create_agent(NewAgent {
                model: &self.settings.model_deployment_name,
                name: STRUCTURE_AGENT_NAME,
                instructions: STRUCTURE_AGENT_INSTRUCTIONS,
            })
            .await?;
        Ok(id)
    }

    /// The whole poll loop, in-flight requests included, is bounded by the run
    /// deadline.
    async fn await_completion(
        &self,
        thread: &ThreadRecord,
        run: RunRecord,
        debug: bool,
    ) -> Result<RunRecord, AgentRunError> {
        let mut last_status = run.status;
        let settled = timeout(
            self.settings.run_timeout,
            self.poll_until_settled(&thread.id, run, &mut last_status),
        )
        .await;
        let run = match settled {
            Ok(run) => run?,
            Err(_) => return Err(AgentRunError::Timeout { status: last_status }),
        };

        match run.status {
            RunStatus::Completed => Ok(run),
            status @ RunStatus::RequiresAction => Err(AgentRunError::RequiresAction { status }),
            status => {
                let run_steps =
                    if debug { Some(self.run_steps(&thread.id, &run.id).await) } else { None };
                Err(AgentRunError::RunNotCompleted {
                    status,
                    run_id: run.id,
                    last_error: run.last_error,
                    run_steps,
                })
            }
        }
    }

    async fn poll_until_settled(
        &self,
        thread_id: &str,
        mut run: RunRecord,
        last_status: &mut RunStatus,
    ) -> Result<RunRecord, AgentRunError> {
        while run.status.is_pending() {
            *last_status = run.status;
            sleep(self.settings.poll_interval).await;
            run = self.api.get_run(thread_id, &run.id).await?;
            debug!(run_id = %run.id, status = %run.status, "polled agent run");
        }
        Ok(run)
    }

    async fn run_steps(&self, thread_id: &str, run_id: &str) -> RunStepsDiagnostic {
        match self.api.list_run_steps(thread_id, run_id).await {
            Ok(steps) => RunStepsDiagnostic::Steps(steps),
            Err(error) => {
                warn!(run_id, error = %error, "could not list run steps");
                RunStepsDiagnostic::Unavailable { run_steps_error: error.to_string() }
            }
        }
    }

    async fn last_agent_text(&self, thread_id: &str) -> Result<String, AgentRunError> {
        let messages = self.api.list_messages(thread_id).await?;
        Ok(messages
            .iter()
            .filter(|message| message.is_from_agent())
            .flat_map(|message| message.text_blocks())
            .last()
            .map(str::to_string)
            .unwrap_or_else(|| NO_RESPONSE_CONTENT.to_string()))
    }
}

/// REST client for the hosted agents service.
#[derive(Clone)]
pub struct HttpAgentsClient {
    client: Client,
    endpoint: String,
    api_version: String,
    api_key: Option<SecretString>,
}

#[derive(Deserialize)]
struct ListPage<T> {
    data: Vec<T>,
}

impl HttpAgentsClient {
    pub fn from_config(config: &AgentServiceConfig) -> Result<Self, AgentRunError> {
        let endpoint = config
            .project_endpoint
            .as_deref()
            .map(|endpoint| endpoint.trim().trim_end_matches('/').to_string())
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or(AgentRunError::MissingConfiguration(vec![PROJECT_ENDPOINT_VAR]))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|error| AgentApiError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint)
    }

    async fn send_json<T>(&self, request: RequestBuilder) -> Result<T, AgentApiError>
    where
        T: DeserializeOwned,
    {
        let request = request.query(&[("api-version", self.api_version.as_str())]);
        let request = match &self.api_key {
            Some(api_key) => request.bearer_auth(api_key.expose_secret()),
            None => request,
        };

        let response =
            request.send().await.map_err(|error| AgentApiError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentApiError::Status { status: status.as_u16(), body });
        }

        response.json::<T>().await.map_err(|error| AgentApiError::Decode(error.to_string()))
    }
}

#[async_trait]
impl AgentsApi for HttpAgentsClient {
    async fn create_agent(&self, agent: NewAgent<'_>) -> Result<AgentRecord, AgentApiError> {
        self.send_json(self.client.post(self.url("assistants")).json(&agent)).await
    }

    async fn create_thread(&self) -> Result<ThreadRecord, AgentApiError> {
        self.send_json(self.client.post(self.url("threads")).json(&json!({}))).await
    }

    async fn post_user_message(&self, thread_id: &str, content: &str) -> Result<(), AgentApiError> {
        let _: Value = self
            .send_json(
                self.client
                    .post(self.url(&format!("threads/{thread_id}/messages")))
                    .json(&json!({ "role": "user", "content": content })),
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<RunRecord, AgentApiError> {
        self.send_json(
            self.client
                .post(self.url(&format!("threads/{thread_id}/runs")))
                .json(&json!({ "assistant_id": agent_id })),
        )
        .await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunRecord, AgentApiError> {
        self.send_json(self.client.get(self.url(&format!("threads/{thread_id}/runs/{run_id}"))))
            .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AgentApiError> {
        let page: ListPage<ThreadMessage> = self
            .send_json(
                self.client
                    .get(self.url(&format!("threads/{thread_id}/messages")))
                    .query(&[("order", "asc")]),
            )
            .await?;
        Ok(page.data)
    }

    async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Vec<RunStepSummary>, AgentApiError> {
        let page: ListPage<RunStepSummary> = self
            .send_json(
                self.client.get(self.url(&format!("threads/{thread_id}/runs/{run_id}/steps"))),
            )
            .await?;
        Ok(page.data)
    }
}
