use std::sync::Arc;

use structure_agent_agent::runtime::{ConversationTurnHandler, SessionLimits};
use structure_agent_core::audit::TracingAuditSink;
use structure_agent_core::config::AppConfig;
use tracing::{info, warn};

use crate::routes::{AppState, ConfiguredForwarder};

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let forwarding_missing = config.agent.missing_required();
    if forwarding_missing.is_empty() {
        info!(
            event_name = "system.bootstrap.agent_configured",
            correlation_id = "bootstrap",
            agent_id = config.agent.agent_id.as_deref().unwrap_or("<create per request>"),
            "agent forwarding enabled"
        );
    } else {
        warn!(
            event_name = "system.bootstrap.agent_unconfigured",
            correlation_id = "bootstrap",
            missing = %forwarding_missing.join(", "),
            "agent forwarding disabled until required variables are set"
        );
    }

    let state = AppState {
        turns: Arc::new(ConversationTurnHandler::with_limits(
            TracingAuditSink,
            SessionLimits::from_config(&config.server),
        )),
        forwarder: Arc::new(ConfiguredForwarder::new(config.agent.clone())),
        forwarding_missing,
    };

    Application { config, state }
}

#[cfg(test)]
mod tests {
    use structure_agent_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap_with_config;

    #[test]
    fn bootstrap_without_agent_settings_still_serves_dialogue() {
        let app = bootstrap_with_config(AppConfig::default());

        assert_eq!(app.state.forwarding_missing, vec!["PROJECT_ENDPOINT", "MODEL_DEPLOYMENT_NAME"]);
        let session_id = app.state.turns.start_session();
        let reply = app
            .state
            .turns
            .take_turn(&session_id, "x=1 y=2 z=3", "bootstrap-test")
            .expect("dialogue should accept a turn");
        assert!(!reply.done);
    }

    #[test]
    fn bootstrap_with_overrides_enables_forwarding() {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                project_endpoint: Some("https://agents.example.test/api/projects/demo".to_string()),
                model_deployment_name: Some("gpt-4o-mini".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("overrides should produce a valid config");
        let app = bootstrap_with_config(config);

        assert!(app.state.forwarding_missing.is_empty());
        assert_eq!(app.config.agent.model_deployment_name.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn session_store_follows_configured_cap() {
        let mut config = AppConfig::default();
        config.server.max_sessions = 3;
        let app = bootstrap_with_config(config);

        for index in 0..10 {
            let session_id = format!("cap-{index}");
            assert!(app.state.turns.take_turn(&session_id, "hello", "bootstrap-cap").is_ok());
        }
        assert_eq!(app.state.turns.session_count(), 3);
    }
}
