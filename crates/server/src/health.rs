use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    forwarding_missing: Vec<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub agent: HealthCheck,
    pub checked_at: String,
}

pub fn router(forwarding_missing: Vec<&'static str>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { forwarding_missing })
}

/// Always 200: the local dialogue keeps working without agent settings, so a
/// missing variable only degrades the forwarder.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let agent = agent_check(&state.forwarding_missing);
    let ready = agent.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "structure-agent-server runtime initialized".to_string(),
        },
        agent,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

fn agent_check(missing: &[&'static str]) -> HealthCheck {
    if missing.is_empty() {
        HealthCheck { status: "ready", detail: "agent service configured".to_string() }
    } else {
        HealthCheck {
            status: "degraded",
            detail: format!("prompt forwarding disabled, missing: {}", missing.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_is_ready_when_agent_is_configured() {
        let (status, Json(payload)) =
            health(State(HealthState { forwarding_missing: Vec::new() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.agent.status, "ready");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_is_degraded_without_agent_settings() {
        let (status, Json(payload)) = health(State(HealthState {
            forwarding_missing: vec!["PROJECT_ENDPOINT", "MODEL_DEPLOYMENT_NAME"],
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "degraded");
        assert_eq!(
            payload.agent.detail,
            "prompt forwarding disabled, missing: PROJECT_ENDPOINT, MODEL_DEPLOYMENT_NAME"
        );
        assert_eq!(payload.service.status, "ready");
    }
}
