use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use structure_agent_core::config::{
    AppConfig, LoadOptions, AGENT_ID_VAR, MODEL_DEPLOYMENT_NAME_VAR, PROJECT_ENDPOINT_VAR,
};
use toml::Value;

struct FieldSources<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl FieldSources<'_> {
    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        format!("- {key_path} = {value} (source: {})", self.source(key_path, env_keys))
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = FieldSources { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let agent = &config.agent;
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(sources.line(
        "agent.project_endpoint",
        agent.project_endpoint.as_deref().unwrap_or("<unset>"),
        &[PROJECT_ENDPOINT_VAR],
    ));
    lines.push(sources.line(
        "agent.model_deployment_name",
        agent.model_deployment_name.as_deref().unwrap_or("<unset>"),
        &[MODEL_DEPLOYMENT_NAME_VAR],
    ));
    lines.push(sources.line(
        "agent.agent_id",
        agent.agent_id.as_deref().unwrap_or("<create per request>"),
        &[AGENT_ID_VAR],
    ));
    lines.push(sources.line(
        "agent.api_key",
        if agent.api_key.is_some() { "<redacted>" } else { "<unset>" },
        &["STRUCTURE_AGENT_API_KEY"],
    ));
    lines.push(sources.line(
        "agent.api_version",
        &agent.api_version,
        &["STRUCTURE_AGENT_API_VERSION"],
    ));
    lines.push(sources.line(
        "agent.run_timeout_secs",
        &agent.run_timeout_secs.to_string(),
        &["STRUCTURE_AGENT_RUN_TIMEOUT_SECS"],
    ));
    lines.push(sources.line(
        "agent.poll_interval_ms",
        &agent.poll_interval_ms.to_string(),
        &["STRUCTURE_AGENT_POLL_INTERVAL_MS"],
    ));
    lines.push(sources.line(
        "agent.request_timeout_secs",
        &agent.request_timeout_secs.to_string(),
        &["STRUCTURE_AGENT_REQUEST_TIMEOUT_SECS"],
    ));

    lines.push(sources.line(
        "server.bind_address",
        &config.server.bind_address,
        &["STRUCTURE_AGENT_SERVER_BIND_ADDRESS"],
    ));
    lines.push(sources.line(
        "server.port",
        &config.server.port.to_string(),
        &["STRUCTURE_AGENT_SERVER_PORT"],
    ));
    lines.push(sources.line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        &["STRUCTURE_AGENT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    ));
    lines.push(sources.line(
        "server.max_sessions",
        &config.server.max_sessions.to_string(),
        &["STRUCTURE_AGENT_SERVER_MAX_SESSIONS"],
    ));
    lines.push(sources.line(
        "server.session_idle_secs",
        &config.server.session_idle_secs.to_string(),
        &["STRUCTURE_AGENT_SERVER_SESSION_IDLE_SECS"],
    ));

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["STRUCTURE_AGENT_LOGGING_LEVEL", "STRUCTURE_AGENT_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["STRUCTURE_AGENT_LOGGING_FORMAT", "STRUCTURE_AGENT_LOG_FORMAT"],
    ));

    let missing = agent.missing_required();
    if !missing.is_empty() {
        lines.push(format!("prompt forwarding disabled, missing: {}", missing.join(", ")));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("structure-agent.toml"), PathBuf::from("config/structure-agent.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
