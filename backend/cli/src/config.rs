use std::time::Duration;

use cligate_invoker::InvokerConfig;
use cligate_session::SessionStoreConfig;

/// cligate runtime configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Log level fallback when RUST_LOG is unset
    pub log_level: String,
    /// Directory for rolling NDJSON log files
    pub log_dir: String,

    // External CLI
    pub cli_command: String,
    pub cli_args_current: Vec<String>,
    pub cli_args_general: Vec<String>,
    pub cli_timeout: Duration,

    // Session store
    pub session_max_turns: usize,
    pub session_idle_ttl: Duration,
    pub eviction_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let invoker = InvokerConfig::default();
        let sessions = SessionStoreConfig::default();
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
            cli_command: invoker.command,
            cli_args_current: invoker.args_current,
            cli_args_general: invoker.args_general,
            cli_timeout: invoker.timeout,
            session_max_turns: sessions.max_turns,
            session_idle_ttl: sessions.idle_ttl,
            eviction_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: std::env::var("CLIGATE_BIND")
                .unwrap_or(defaults.bind_address),
            port: std::env::var("CLIGATE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_dir: std::env::var("CLIGATE_LOG_DIR").unwrap_or(defaults.log_dir),
            cli_command: std::env::var("CLIGATE_CLI_BIN").unwrap_or(defaults.cli_command),
            cli_args_current: env_args("CLIGATE_CLI_ARGS_CURRENT")
                .unwrap_or(defaults.cli_args_current),
            cli_args_general: env_args("CLIGATE_CLI_ARGS_GENERAL")
                .unwrap_or(defaults.cli_args_general),
            cli_timeout: env_secs("CLIGATE_CLI_TIMEOUT_SECS")
                .unwrap_or(defaults.cli_timeout),
            session_max_turns: std::env::var("CLIGATE_SESSION_MAX_TURNS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.session_max_turns),
            session_idle_ttl: env_secs("CLIGATE_SESSION_TTL_SECS")
                .unwrap_or(defaults.session_idle_ttl),
            eviction_interval: env_secs("CLIGATE_EVICTION_INTERVAL_SECS")
                .unwrap_or(defaults.eviction_interval),
        }
    }

    pub fn invoker_config(&self) -> InvokerConfig {
        InvokerConfig {
            command: self.cli_command.clone(),
            args_current: self.cli_args_current.clone(),
            args_general: self.cli_args_general.clone(),
            timeout: self.cli_timeout,
        }
    }

    pub fn session_config(&self) -> SessionStoreConfig {
        SessionStoreConfig {
            max_turns: self.session_max_turns,
            idle_ttl: self.session_idle_ttl,
        }
    }
}

/// Whitespace-separated argument list from an env var.
fn env_args(key: &str) -> Option<Vec<String>> {
    std::env::var(key)
        .ok()
        .map(|v| v.split_whitespace().map(str::to_string).collect())
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
}
