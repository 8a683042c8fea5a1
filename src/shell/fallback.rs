//! Tier 3: hand the command to a generative text service and turn whatever
//! comes back into well-formed shell output.
//!
//! Every path out of [`FallbackAdapter::reply`] is a `CommandResult`; service
//! failures become fixed messages with exit code 127.

use std::future::Future;
use std::time::Duration;

use llm_api::{LlmApiClient, LlmApiError};
use session_store::SessionEvent;
use thiserror::Error;

use crate::core::session::SessionState;
use crate::logging::SessionLogger;
use crate::shell::builtins::identity_output;
use crate::shell::prompt::build_shell_prompt;
use crate::shell::CommandResult;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(35);
pub const DEFAULT_SERVICE_NAME: &str = "LLM";
pub const NOT_FOUND_EXIT_CODE: i32 = 127;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("{kind}: {details}")]
    Other { kind: String, details: String },
}

impl From<LlmApiError> for GenerateError {
    fn from(error: LlmApiError) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connection(error.to_string())
        } else {
            Self::Other {
                kind: error.kind().to_string(),
                details: error.to_string(),
            }
        }
    }
}

/// Source of generated text for a prompt.
pub trait TextGenerator: Send + Sync {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, GenerateError>> + Send;
}

impl TextGenerator for LlmApiClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        self.generate(prompt).await.map_err(GenerateError::from)
    }
}

#[derive(Debug)]
pub struct FallbackAdapter<G> {
    generator: G,
    timeout: Duration,
    service_name: String,
}

impl<G: TextGenerator> FallbackAdapter<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            timeout: DEFAULT_TIMEOUT,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub async fn reply(
        &self,
        state: &SessionState,
        command: &str,
        logger: &SessionLogger,
    ) -> CommandResult {
        let prompt = build_shell_prompt(state, command);
        tracing::debug!(session_id = logger.session_id(), cmd = command, "using fallback");

        let outcome = tokio::time::timeout(self.timeout, self.generator.complete(&prompt))
            .await
            .unwrap_or(Err(GenerateError::Timeout));
        let cmd = command.to_string();
        let service = &self.service_name;

        match outcome {
            Ok(text) if !text.trim().is_empty() => {
                let output = post_validate(state, command, text.trim());
                logger.emit(SessionEvent::llm_success(command, &output));
                CommandResult::ok(output)
            }
            Ok(_) => {
                logger.emit(SessionEvent::LlmEmpty { cmd });
                CommandResult::with_code(
                    format!("bash: {command}: command not found\n"),
                    NOT_FOUND_EXIT_CODE,
                )
            }
            Err(GenerateError::Timeout) => {
                logger.emit(SessionEvent::LlmTimeout { cmd });
                CommandResult::with_code(
                    format!("bash: {command}: {service} unavailable (timeout)\n"),
                    NOT_FOUND_EXIT_CODE,
                )
            }
            Err(GenerateError::Connection(error)) => {
                logger.emit(SessionEvent::LlmConnectionError { cmd, error });
                CommandResult::with_code(
                    format!("bash: {command}: {service} unavailable (connection)\n"),
                    NOT_FOUND_EXIT_CODE,
                )
            }
            Err(GenerateError::Other { kind, details }) => {
                let output = format!("bash: {command}: {service} error ({kind})\n");
                logger.emit(SessionEvent::LlmError {
                    cmd,
                    error: kind,
                    details,
                });
                CommandResult::with_code(output, NOT_FOUND_EXIT_CODE)
            }
        }
    }
}

/// Identity commands always answer from session state; anything else loses
/// code fences and ends with exactly one newline.
pub fn post_validate(state: &SessionState, command: &str, response: &str) -> String {
    if let Some(output) = identity_output(state, command) {
        return output;
    }

    let normalized = response.replace("\r\n", "\n").replace('\r', "\n");
    let kept: Vec<&str> = normalized
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect();
    let joined = kept.join("\n").replace("```", "");
    let cleaned = joined.trim_matches('\n');
    if cleaned.is_empty() {
        String::new()
    } else {
        format!("{cleaned}\n")
    }
}
