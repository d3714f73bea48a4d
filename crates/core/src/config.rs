use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROJECT_ENDPOINT_VAR: &str = "PROJECT_ENDPOINT";
pub const MODEL_DEPLOYMENT_NAME_VAR: &str = "MODEL_DEPLOYMENT_NAME";
pub const AGENT_ID_VAR: &str = "AGENT_ID";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub agent: AgentServiceConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Hosted agent service the prompt endpoint forwards to.
#[derive(Clone, Debug)]
pub struct AgentServiceConfig {
    pub project_endpoint: Option<String>,
    pub model_deployment_name: Option<String>,
    /// Reuse this agent instead of creating one per request.
    pub agent_id: Option<String>,
    pub api_key: Option<SecretString>,
    pub api_version: String,
    pub run_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    /// Upper bound on dialogue sessions held in memory.
    pub max_sessions: usize,
    pub session_idle_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub project_endpoint: Option<String>,
    pub model_deployment_name: Option<String>,
    pub agent_id: Option<String>,
    pub api_key: Option<String>,
    pub run_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent: AgentServiceConfig {
                project_endpoint: None,
                model_deployment_name: None,
                agent_id: None,
                api_key: None,
                api_version: "v1".to_string(),
                run_timeout_secs: 60,
                poll_interval_ms: 1_000,
                request_timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 7071,
                graceful_shutdown_secs: 15,
                max_sessions: 10_000,
                session_idle_secs: 1_800,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AgentServiceConfig {
    /// Names of the environment variables a forwarded prompt still needs.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            (PROJECT_ENDPOINT_VAR, self.project_endpoint.as_deref()),
            (MODEL_DEPLOYMENT_NAME_VAR, self.model_deployment_name.as_deref()),
        ]
        .into_iter()
        .filter(|(_, value)| value.map(|value| value.trim().is_empty()).unwrap_or(true))
        .map(|(name, _)| name)
        .collect()
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("structure-agent.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(agent) = patch.agent {
            if let Some(project_endpoint) = agent.project_endpoint {
                self.agent.project_endpoint = Some(project_endpoint);
            }
            if let Some(model_deployment_name) = agent.model_deployment_name {
                self.agent.model_deployment_name = Some(model_deployment_name);
            }
            if let Some(agent_id) = agent.agent_id {
                self.agent.agent_id = Some(agent_id);
            }
            if let Some(agent_api_key_value) = agent.api_key {
                self.agent.api_key = Some(secret_value(agent_api_key_value));
            }
            if let Some(api_version) = agent.api_version {
                self.agent.api_version = api_version;
            }
            if let Some(run_timeout_secs) = agent.run_timeout_secs {
                self.agent.run_timeout_secs = run_timeout_secs;
            }
            if let Some(poll_interval_ms) = agent.poll_interval_ms {
                self.agent.poll_interval_ms = poll_interval_ms;
            }
            if let Some(request_timeout_secs) = agent.request_timeout_secs {
                self.agent.request_timeout_secs = request_timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(max_sessions) = server.max_sessions {
                self.server.max_sessions = max_sessions;
            }
            if let Some(session_idle_secs) = server.session_idle_secs {
                self.server.session_idle_secs = session_idle_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env(PROJECT_ENDPOINT_VAR) {
            self.agent.project_endpoint = Some(value);
        }
        if let Some(value) = read_env(MODEL_DEPLOYMENT_NAME_VAR) {
            self.agent.model_deployment_name = Some(value);
        }
        if let Some(value) = read_env(AGENT_ID_VAR) {
            self.agent.agent_id = Some(value);
        }
        if let Some(value) = read_env("STRUCTURE_AGENT_API_KEY") {
            self.agent.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("STRUCTURE_AGENT_API_VERSION") {
            self.agent.api_version = value;
        }
        if let Some(value) = read_env("STRUCTURE_AGENT_RUN_TIMEOUT_SECS") {
            self.agent.run_timeout_secs = parse_u64("STRUCTURE_AGENT_RUN_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("STRUCTURE_AGENT_POLL_INTERVAL_MS") {
            self.agent.poll_interval_ms = parse_u64("STRUCTURE_AGENT_POLL_INTERVAL_MS", &value)?;
        }
        if let Some(value) = read_env("STRUCTURE_AGENT_REQUEST_TIMEOUT_SECS") {
            self.agent.request_timeout_secs =
                parse_u64("STRUCTURE_AGENT_REQUEST_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("STRUCTURE_AGENT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("STRUCTURE_AGENT_SERVER_PORT") {
            self.server.port = parse_u16("STRUCTURE_AGENT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("STRUCTURE_AGENT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("STRUCTURE_AGENT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("STRUCTURE_AGENT_SERVER_MAX_SESSIONS") {
            self.server.max_sessions =
                parse_usize("STRUCTURE_AGENT_SERVER_MAX_SESSIONS", &value)?;
        }
        if let Some(value) = read_env("STRUCTURE_AGENT_SERVER_SESSION_IDLE_SECS") {
            self.server.session_idle_secs =
                parse_u64("STRUCTURE_AGENT_SERVER_SESSION_IDLE_SECS", &value)?;
        }

        let log_level = read_env("STRUCTURE_AGENT_LOGGING_LEVEL")
            .or_else(|| read_env("STRUCTURE_AGENT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("STRUCTURE_AGENT_LOGGING_FORMAT")
            .or_else(|| read_env("STRUCTURE_AGENT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(project_endpoint) = overrides.project_endpoint {
            self.agent.project_endpoint = Some(project_endpoint);
        }
        if let Some(model_deployment_name) = overrides.model_deployment_name {
            self.agent.model_deployment_name = Some(model_deployment_name);
        }
        if let Some(agent_id) = overrides.agent_id {
            self.agent.agent_id = Some(agent_id);
        }
        if let Some(api_key) = overrides.api_key {
            self.agent.api_key = Some(secret_value(api_key));
        }
        if let Some(run_timeout_secs) = overrides.run_timeout_secs {
            self.agent.run_timeout_secs = run_timeout_secs;
        }
        if let Some(poll_interval_ms) = overrides.poll_interval_ms {
            self.agent.poll_interval_ms = poll_interval_ms;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_agent(&self.agent)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("structure-agent.toml"), PathBuf::from("config/structure-agent.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_agent(agent: &AgentServiceConfig) -> Result<(), ConfigError> {
    if let Some(endpoint) = &agent.project_endpoint {
        let endpoint = endpoint.trim();
        if !endpoint.is_empty()
            && !endpoint.starts_with("http://")
            && !endpoint.starts_with("https://")
        {
            return Err(ConfigError::Validation(
                "agent.project_endpoint must start with http:// or https://".to_string(),
            ));
        }
    }

    if let Some(api_key) = &agent.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "agent.api_key must not be blank when provided".to_string(),
            ));
        }
    }

    if agent.api_version.trim().is_empty() {
        return Err(ConfigError::Validation("agent.api_version must not be empty".to_string()));
    }

    if agent.run_timeout_secs == 0 || agent.run_timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "agent.run_timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    if agent.poll_interval_ms == 0 || agent.poll_interval_ms > agent.run_timeout_secs * 1_000 {
        return Err(ConfigError::Validation(
            "agent.poll_interval_ms must be positive and shorter than agent.run_timeout_secs"
                .to_string(),
        ));
    }

    if agent.request_timeout_secs == 0 || agent.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "agent.request_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if server.max_sessions == 0 || server.session_idle_secs == 0 {
        return Err(ConfigError::Validation(
            "server.max_sessions and server.session_idle_secs must be greater than zero"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    agent: Option<AgentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    project_endpoint: Option<String>,
    model_deployment_name: Option<String>,
    agent_id: Option<String>,
    api_key: Option<String>,
    api_version: Option<String>,
    run_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    max_sessions: Option<usize>,
    session_idle_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_agent_settings() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["PROJECT_ENDPOINT", "MODEL_DEPLOYMENT_NAME", "AGENT_ID"]);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.agent.run_timeout_secs == 60, "default run deadline should be 60s")?;
        ensure(config.agent.poll_interval_ms == 1_000, "default poll interval should be 1s")?;
        ensure(
            config.agent.missing_required() == vec!["PROJECT_ENDPOINT", "MODEL_DEPLOYMENT_NAME"],
            "both agent variables should be reported missing",
        )?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "default format is compact")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_AGENT_API_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("structure-agent.toml");
            fs::write(
                &path,
                r#"
[agent]
project_endpoint = "https://example.services.ai.azure.com/api/projects/demo"
model_deployment_name = "gpt-4o-mini"
api_key = "${TEST_AGENT_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.agent.api_key.as_ref().map(|key| key.expose_secret() == "key-from-env")
                    == Some(true),
                "api key should be interpolated from environment",
            )?;
            ensure(config.agent.missing_required().is_empty(), "file supplies required values")?;
            Ok(())
        })();

        clear_vars(&["TEST_AGENT_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("STRUCTURE_AGENT_LOG_LEVEL", "warn");
        env::set_var("STRUCTURE_AGENT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["STRUCTURE_AGENT_LOG_LEVEL", "STRUCTURE_AGENT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MODEL_DEPLOYMENT_NAME", "model-from-env");
        env::set_var("AGENT_ID", "asst_from_env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("structure-agent.toml");
            fs::write(
                &path,
                r#"
[agent]
model_deployment_name = "model-from-file"
agent_id = "asst_from_file"
run_timeout_secs = 45

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    agent_id: Some("asst_from_override".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.agent.agent_id.as_deref() == Some("asst_from_override"),
                "override agent id should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.agent.model_deployment_name.as_deref() == Some("model-from-env"),
                "env model should win over file and defaults",
            )?;
            ensure(config.agent.run_timeout_secs == 45, "file timeout should beat the default")?;
            Ok(())
        })();

        clear_vars(&["MODEL_DEPLOYMENT_NAME", "AGENT_ID"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PROJECT_ENDPOINT", "example.azure.com");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("agent.project_endpoint")
            );
            ensure(has_message, "validation failure should mention agent.project_endpoint")
        })();

        clear_vars(&["PROJECT_ENDPOINT"]);
        result
    }

    #[test]
    fn session_limits_come_from_env_and_reject_zero() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("STRUCTURE_AGENT_SERVER_MAX_SESSIONS", "250");
        env::set_var("STRUCTURE_AGENT_SERVER_SESSION_IDLE_SECS", "90");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.server.max_sessions == 250, "session cap should come from env")?;
            ensure(config.server.session_idle_secs == 90, "idle expiry should come from env")?;

            env::set_var("STRUCTURE_AGENT_SERVER_MAX_SESSIONS", "0");
            let rejected = matches!(
                AppConfig::load(LoadOptions::default()),
                Err(ConfigError::Validation(ref message)) if message.contains("server.max_sessions")
            );
            ensure(rejected, "a zero session cap should fail validation")
        })();

        clear_vars(&[
            "STRUCTURE_AGENT_SERVER_MAX_SESSIONS",
            "STRUCTURE_AGENT_SERVER_SESSION_IDLE_SECS",
        ]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("STRUCTURE_AGENT_API_KEY", "agent-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("agent-secret-value"), "debug output should not contain key")
        })();

        clear_vars(&["STRUCTURE_AGENT_API_KEY"]);
        result
    }
}
