use serde::Serialize;
use structure_agent_agent::llm::{AgentsApi, RunStatus};
use structure_agent_agent::remote::{
    AgentRunError, AgentRunSettings, AgentRunner, HttpAgentsClient, RunStepsDiagnostic,
};
use structure_agent_agent::reply::inspect_reply;
use structure_agent_core::config::{AppConfig, LoadOptions};
use structure_agent_core::domain::requirements::RequirementsDocument;
use uuid::Uuid;

use crate::commands::CommandResult;

const COMMAND: &str = "ask";

#[derive(Debug, Serialize)]
struct AskReport {
    command: &'static str,
    status: &'static str,
    response: String,
    run_status: RunStatus,
    agent_id: String,
    thread_id: String,
    done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    structure_requirements: Option<RequirementsDocument>,
}

#[derive(Debug, Serialize)]
struct AskFailure {
    command: &'static str,
    status: &'static str,
    error_class: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_status: Option<RunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_steps: Option<RunStepsDiagnostic>,
}

pub fn run(prompt: &str, debug: bool) -> CommandResult {
    if prompt.trim().is_empty() {
        return CommandResult::failure(COMMAND, "bad_request", "prompt must not be empty", 2);
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2)
        }
    };

    let settings = match AgentRunSettings::from_config(&config.agent) {
        Ok(settings) => settings,
        Err(error) => return failure(error),
    };
    let client = match HttpAgentsClient::from_config(&config.agent) {
        Ok(client) => client,
        Err(error) => return failure(error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };

    runtime.block_on(forward(&AgentRunner::new(client, settings), prompt, debug))
}

/// Forwards one prompt and renders the outcome as a command payload.
pub async fn forward<A>(runner: &AgentRunner<A>, prompt: &str, debug: bool) -> CommandResult
where
    A: AgentsApi,
{
    let correlation_id = Uuid::new_v4().to_string();
    match runner.run_prompt(prompt, &correlation_id, debug).await {
        Ok(reply) => {
            let inspection = inspect_reply(&reply.response, &correlation_id);
            CommandResult::payload(&AskReport {
                command: COMMAND,
                status: "ok",
                response: reply.response,
                run_status: reply.run_status,
                agent_id: reply.agent_id,
                thread_id: reply.thread_id,
                done: inspection.done,
                structure_requirements: inspection.structure_requirements,
            })
        }
        Err(error) => failure(error),
    }
}

fn failure(error: AgentRunError) -> CommandResult {
    let error_class = error.status_class();
    let message = error.to_string();
    let mut payload = AskFailure {
        command: COMMAND,
        status: "error",
        error_class,
        message,
        missing: None,
        run_status: None,
        run_id: None,
        run_steps: None,
    };

    let exit_code = match error {
        AgentRunError::MissingConfiguration(missing) => {
            payload.missing = Some(missing);
            2
        }
        AgentRunError::Timeout { status } | AgentRunError::RequiresAction { status } => {
            payload.run_status = Some(status);
            3
        }
        AgentRunError::RunNotCompleted { status, run_id, run_steps, .. } => {
            payload.run_status = Some(status);
            payload.run_id = Some(run_id);
            payload.run_steps = run_steps;
            3
        }
        AgentRunError::Api(_) => 1,
    };

    CommandResult { exit_code, ..CommandResult::payload(&payload) }
}
