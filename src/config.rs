//! Environment configuration.

use std::env;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:2222";
pub const DEFAULT_USER: &str = "user";
pub const DEFAULT_PASSWORD: &str = "password";
pub const DEFAULT_HOSTNAME: &str = "honeypot";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LLM_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_LLM_MODEL: &str = "mistral:latest";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 35;
pub const DEFAULT_MAX_SESSIONS: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}: invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to read filesystem template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse filesystem template {path}: {source}")]
    TemplateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub listen_addr: SocketAddr,
    pub user: String,
    pub password: String,
    pub hostname: String,
    pub log_dir: PathBuf,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub max_sessions: usize,
    pub template_path: Option<PathBuf>,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_sessions = env_parse("DECOY_MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?;
        if max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DECOY_MAX_SESSIONS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            listen_addr: env_parse("DECOY_LISTEN_ADDR", default_listen_addr())?,
            user: env_string("DECOY_USER", DEFAULT_USER),
            password: env_string("DECOY_PASSWORD", DEFAULT_PASSWORD),
            hostname: env_string("DECOY_HOSTNAME", DEFAULT_HOSTNAME),
            log_dir: PathBuf::from(env_string("DECOY_LOG_DIR", DEFAULT_LOG_DIR)),
            llm_url: env_string("DECOY_LLM_URL", DEFAULT_LLM_URL),
            llm_model: env_string("DECOY_LLM_MODEL", DEFAULT_LLM_MODEL),
            llm_timeout: Duration::from_secs(env_parse(
                "DECOY_LLM_TIMEOUT_SEC",
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
            max_sessions,
            template_path: env_string_opt("DECOY_TEMPLATE_PATH").map(PathBuf::from),
        })
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 2222))
}

fn env_string(key: &str, default: &str) -> String {
    env_string_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string_opt(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|error: T::Err| ConfigError::InvalidValue {
                key,
                reason: error.to_string(),
                value,
            }),
    }
}
