//! HTTP surface: the local requirements dialogue and the hosted-agent forwarder.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use structure_agent_agent::llm::AgentsApi;
use structure_agent_agent::remote::{
    AgentReply, AgentRunError, AgentRunSettings, AgentRunner, HttpAgentsClient,
    RunStepsDiagnostic,
};
use structure_agent_agent::reply::inspect_reply;
use structure_agent_agent::runtime::ConversationTurnHandler;
use structure_agent_core::config::AgentServiceConfig;
use structure_agent_core::domain::requirements::RequirementsDocument;
use structure_agent_core::errors::{ApplicationError, InterfaceError};
use structure_agent_core::DialoguePhase;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::health;

const MISSING_PROMPT_MESSAGE: &str =
    "Missing 'prompt'. Supply in JSON body { 'prompt': '...' } or as query parameter ?prompt=...";

/// Sends one prompt to the hosted agent.
#[async_trait]
pub trait PromptForwarder: Send + Sync {
    async fn forward(
        &self,
        prompt: &str,
        correlation_id: &str,
        debug: bool,
    ) -> Result<AgentReply, AgentRunError>;
}

/// Resolves agent settings per request so missing variables surface as a
/// response instead of a startup failure.
pub struct ConfiguredForwarder {
    agent: AgentServiceConfig,
}

impl ConfiguredForwarder {
    pub fn new(agent: AgentServiceConfig) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl PromptForwarder for ConfiguredForwarder {
    async fn forward(
        &self,
        prompt: &str,
        correlation_id: &str,
        debug: bool,
    ) -> Result<AgentReply, AgentRunError> {
        let settings = AgentRunSettings::from_config(&self.agent)?;
        let client = HttpAgentsClient::from_config(&self.agent)?;
        AgentRunner::new(client, settings).run_prompt(prompt, correlation_id, debug).await
    }
}

#[async_trait]
impl<A> PromptForwarder for AgentRunner<A>
where
    A: AgentsApi,
{
    async fn forward(
        &self,
        prompt: &str,
        correlation_id: &str,
        debug: bool,
    ) -> Result<AgentReply, AgentRunError> {
        self.run_prompt(prompt, correlation_id, debug).await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub turns: Arc<ConversationTurnHandler>,
    pub forwarder: Arc<dyn PromptForwarder>,
    pub forwarding_missing: Vec<&'static str>,
}

pub fn router(state: AppState) -> Router {
    let health_router = health::router(state.forwarding_missing.clone());

    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{session_id}/turns", post(take_turn))
        .route(
            "/api/structure_agent",
            get(structure_agent).post(structure_agent).options(preflight),
        )
        .with_state(state)
        .merge(health_router)
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TurnRequest {
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub utterance: String,
    pub done: bool,
    pub phase: DialoguePhase,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForwardQuery {
    pub prompt: Option<String>,
    pub debug: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ForwardResponse {
    pub response: String,
    pub run_status: String,
    pub agent_id: String,
    pub thread_id: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure_requirements: Option<RequirementsDocument>,
}

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.turns.start_session();
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

pub async fn take_turn(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<TurnRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    match state.turns.take_turn(&session_id, &request.message, &correlation_id) {
        Ok(reply) => (
            StatusCode::OK,
            Json(TurnResponse {
                session_id: reply.session_id,
                utterance: reply.utterance,
                done: reply.done,
                phase: reply.phase,
            }),
        )
            .into_response(),
        Err(error) => error_response(error.into_interface(correlation_id), Map::new()),
    }
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn structure_agent(
    State(state): State<AppState>,
    Query(query): Query<ForwardQuery>,
    body: Bytes,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    info!(
        event_name = "ingress.structure_agent.invoked",
        correlation_id = %correlation_id,
        "structure_agent invoked"
    );

    let (prompt, debug) = resolve_prompt(query, &body);
    let Some(prompt) = prompt else {
        let error = ApplicationError::InvalidRequest(MISSING_PROMPT_MESSAGE.to_string());
        return error_response(error.into_interface(correlation_id), Map::new());
    };

    match state.forwarder.forward(&prompt, &correlation_id, debug).await {
        Ok(reply) => {
            let inspection = inspect_reply(&reply.response, &correlation_id);
            (
                StatusCode::OK,
                Json(ForwardResponse {
                    response: reply.response,
                    run_status: reply.run_status.to_string(),
                    agent_id: reply.agent_id,
                    thread_id: reply.thread_id,
                    done: inspection.done,
                    structure_requirements: inspection.structure_requirements,
                }),
            )
                .into_response()
        }
        Err(run_error) => {
            error!(
                event_name = "upstream.run.failed",
                correlation_id = %correlation_id,
                error_class = run_error.status_class(),
                error = %run_error,
                "agent interaction failed"
            );
            let extras = run_error_details(&run_error, debug);
            error_response(ApplicationError::from(run_error).into_interface(correlation_id), extras)
        }
    }
}

/// Query parameters win; the JSON body is only read when the query has no prompt.
fn resolve_prompt(query: ForwardQuery, body: &[u8]) -> (Option<String>, bool) {
    let mut debug = query.debug.as_deref().map(is_truthy).unwrap_or(false);
    let mut prompt = query.prompt.filter(|prompt| !prompt.is_empty());

    if prompt.is_none() {
        if let Ok(Value::Object(body)) = serde_json::from_slice::<Value>(body) {
            prompt = body
                .get("prompt")
                .and_then(Value::as_str)
                .filter(|prompt| !prompt.is_empty())
                .map(str::to_string);
            debug = debug || body.get("debug").map(json_flag).unwrap_or(false);
        }
    }

    (prompt, debug)
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn json_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_i64() == Some(1),
        Value::String(text) => is_truthy(text),
        _ => false,
    }
}

fn run_error_details(error: &AgentRunError, debug: bool) -> Map<String, Value> {
    let mut details = Map::new();
    match error {
        AgentRunError::Timeout { status } | AgentRunError::RequiresAction { status } => {
            details.insert("status".to_string(), json!(status));
        }
        AgentRunError::RunNotCompleted { status, run_id, last_error, run_steps } => {
            details.insert("status".to_string(), json!(status));
            details.insert("run_id".to_string(), json!(run_id));
            if debug {
                match run_steps {
                    Some(RunStepsDiagnostic::Steps(steps)) => {
                        details.insert("run_steps".to_string(), json!(steps));
                    }
                    Some(RunStepsDiagnostic::Unavailable { run_steps_error }) => {
                        details.insert("run_steps_error".to_string(), json!(run_steps_error));
                    }
                    None => {}
                }
                if let Some(last_error) = last_error {
                    details.insert("last_error".to_string(), last_error.clone());
                }
            }
        }
        AgentRunError::MissingConfiguration(_) | AgentRunError::Api(_) => {}
    }
    details
}

pub fn status_code(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::MissingConfiguration { .. } | InterfaceError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        InterfaceError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        InterfaceError::UpstreamUnsupported { .. } => StatusCode::NOT_IMPLEMENTED,
        InterfaceError::UpstreamFailure { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(error: InterfaceError, extras: Map<String, Value>) -> Response {
    let mut body = Map::new();
    body.insert("error".to_string(), json!(error.user_message()));
    body.insert("error_class".to_string(), json!(error.status_class()));
    body.insert("detail".to_string(), json!(error.to_string()));
    body.insert("correlation_id".to_string(), json!(error.correlation_id()));
    if let InterfaceError::MissingConfiguration { missing, .. } = &error {
        body.insert("missing".to_string(), json!(missing));
    }
    body.extend(extras);

    (status_code(&error), Json(Value::Object(body))).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Bytes},
        extract::{Path, Query, State},
        http::StatusCode,
        response::Response,
        Json,
    };
    use serde_json::Value;
    use structure_agent_agent::llm::{
        AgentApiError, AgentRecord, AgentsApi, MessageContent, NewAgent, RunRecord, RunStatus,
        RunStepSummary, TextValue, ThreadMessage, ThreadRecord,
    };
    use structure_agent_agent::remote::{AgentRunSettings, AgentRunner};
    use structure_agent_agent::runtime::ConversationTurnHandler;
    use structure_agent_core::config::AgentServiceConfig;
    use structure_agent_core::config::AppConfig;

    use super::{
        create_session, resolve_prompt, structure_agent, take_turn, AppState,
        ConfiguredForwarder, ForwardQuery, PromptForwarder, TurnRequest,
    };

    struct FixedRun {
        status: RunStatus,
        reply: &'static str,
    }

    #[async_trait]
    impl AgentsApi for FixedRun {
        async fn create_agent(&self, _: NewAgent<'_>) -> Result<AgentRecord, AgentApiError> {
            Ok(AgentRecord { id: "asst_fixed".to_string() })
        }

        async fn create_thread(&self) -> Result<ThreadRecord, AgentApiError> {
            Ok(ThreadRecord { id: "thread_fixed".to_string() })
        }

        async fn post_user_message(&self, _: &str, _: &str) -> Result<(), AgentApiError> {
            Ok(())
        }

        async fn create_run(&self, _: &str, _: &str) -> Result<RunRecord, AgentApiError> {
            Ok(RunRecord { id: "run_fixed".to_string(), status: self.status, last_error: None })
        }

        async fn get_run(&self, _: &str, run_id: &str) -> Result<RunRecord, AgentApiError> {
            Ok(RunRecord { id: run_id.to_string(), status: self.status, last_error: None })
        }

        async fn list_messages(&self, _: &str) -> Result<Vec<ThreadMessage>, AgentApiError> {
            Ok(vec![ThreadMessage {
                role: "assistant".to_string(),
                content: vec![MessageContent::Text {
                    text: TextValue { value: self.reply.to_string() },
                }],
            }])
        }

        async fn list_run_steps(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Vec<RunStepSummary>, AgentApiError> {
            Ok(vec![RunStepSummary {
                id: Some("step_1".to_string()),
                step_type: Some("tool_calls".to_string()),
                status: Some("failed".to_string()),
            }])
        }
    }

    fn state_with(forwarder: Arc<dyn PromptForwarder>) -> AppState {
        AppState {
            turns: Arc::new(ConversationTurnHandler::default()),
            forwarder,
            forwarding_missing: Vec::new(),
        }
    }

    fn fixed(status: RunStatus, reply: &'static str) -> AppState {
        state_with(Arc::new(AgentRunner::new(
            FixedRun { status, reply },
            AgentRunSettings {
                model_deployment_name: "gpt-4o-mini".to_string(),
                agent_id: None,
                run_timeout: Duration::from_millis(30),
                poll_interval: Duration::from_millis(5),
            },
        )))
    }

    fn query(prompt: Option<&str>, debug: Option<&str>) -> Query<ForwardQuery> {
        Query(ForwardQuery {
            prompt: prompt.map(str::to_string),
            debug: debug.map(str::to_string),
        })
    }

    async fn json_body(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = match to_bytes(response.into_body(), usize::MAX).await {
            Ok(bytes) => bytes,
            Err(error) => panic!("body should be readable: {error}"),
        };
        let value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(error) => panic!("body should be JSON: {error}"),
        };
        (status, value)
    }

    #[tokio::test]
    async fn session_turns_follow_the_dialogue() {
        let state = fixed(RunStatus::Completed, "");
        let (status, Json(created)) = create_session(State(state.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        for message in ["x=1 y=2 z=3", "cutoff 500hz", "max load 9g"] {
            let response = take_turn(
                State(state.clone()),
                Path(created.session_id.clone()),
                Json(TurnRequest { message: message.to_string() }),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let (status, body) = json_body(
            take_turn(
                State(state.clone()),
                Path(created.session_id.clone()),
                Json(TurnRequest { message: "go ahead".to_string() }),
            )
            .await,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["utterance"], "completed job");
        assert_eq!(body["done"], true);
        assert_eq!(body["phase"], "terminated");

        let (status, body) = json_body(
            take_turn(
                State(state),
                Path(created.session_id),
                Json(TurnRequest { message: "one more".to_string() }),
            )
            .await,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_class"], "conflict");
    }

    #[tokio::test]
    async fn missing_prompt_is_bad_request() {
        let response =
            structure_agent(State(fixed(RunStatus::Completed, "")), query(None, None), Bytes::new())
                .await;
        let (status, body) = json_body(response).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_class"], "bad_request");
    }

    #[tokio::test]
    async fn completed_run_returns_success_envelope() {
        let response = structure_agent(
            State(fixed(RunStatus::Completed, "completed job")),
            query(None, None),
            Bytes::from_static(br#"{"prompt":"yes"}"#),
        )
        .await;
        let (status, body) = json_body(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "completed job");
        assert_eq!(body["run_status"], "completed");
        assert_eq!(body["agent_id"], "asst_fixed");
        assert_eq!(body["thread_id"], "thread_fixed");
        assert_eq!(body["done"], true);
        assert!(body.get("structure_requirements").is_none());
    }

    #[tokio::test]
    async fn upstream_statuses_map_to_gateway_codes() {
        let cases = [
            (RunStatus::InProgress, StatusCode::GATEWAY_TIMEOUT, "upstream_timeout"),
            (RunStatus::RequiresAction, StatusCode::NOT_IMPLEMENTED, "requires_action"),
            (RunStatus::Failed, StatusCode::BAD_GATEWAY, "upstream_failure"),
        ];

        for (run_status, expected_status, expected_class) in cases {
            let response =
                structure_agent(State(fixed(run_status, "")), query(Some("hi"), None), Bytes::new())
                    .await;
            let (status, body) = json_body(response).await;

            assert_eq!(status, expected_status, "{run_status}");
            assert_eq!(body["error_class"], expected_class, "{run_status}");
            assert_eq!(body["status"], run_status.as_str(), "{run_status}");
        }
    }

    #[tokio::test]
    async fn failed_run_lists_steps_only_with_debug() {
        let response = structure_agent(
            State(fixed(RunStatus::Failed, "")),
            query(Some("hi"), Some("true")),
            Bytes::new(),
        )
        .await;
        let (_, body) = json_body(response).await;

        assert_eq!(body["run_id"], "run_fixed");
        assert_eq!(body["run_steps"][0]["type"], "tool_calls");

        let quiet =
            structure_agent(State(fixed(RunStatus::Failed, "")), query(Some("hi"), None), Bytes::new())
                .await;
        let (_, body) = json_body(quiet).await;
        assert!(body.get("run_steps").is_none());
    }

    #[tokio::test]
    async fn unconfigured_forwarder_lists_missing_variables() {
        let agent: AgentServiceConfig = AppConfig::default().agent;
        let state = state_with(Arc::new(ConfiguredForwarder::new(agent)));

        let response = structure_agent(State(state), query(Some("hi"), None), Bytes::new()).await;
        let (status, body) = json_body(response).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Missing required environment variables.");
        assert_eq!(body["missing"][0], "PROJECT_ENDPOINT");
        assert_eq!(body["missing"][1], "MODEL_DEPLOYMENT_NAME");
    }

    #[test]
    fn body_prompt_and_debug_are_read_when_query_is_empty() {
        let (prompt, debug) =
            resolve_prompt(ForwardQuery::default(), br#"{"prompt":"place it","debug":true}"#);
        assert_eq!(prompt.as_deref(), Some("place it"));
        assert!(debug);

        let (prompt, debug) = resolve_prompt(
            ForwardQuery { prompt: Some("from query".to_string()), debug: Some("YES".to_string()) },
            br#"{"prompt":"ignored"}"#,
        );
        assert_eq!(prompt.as_deref(), Some("from query"));
        assert!(debug);

        let (prompt, debug) = resolve_prompt(ForwardQuery::default(), b"not json");
        assert!(prompt.is_none());
        assert!(!debug);
    }
}
