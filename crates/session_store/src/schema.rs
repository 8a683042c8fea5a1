use serde::{Deserialize, Serialize};

/// Maximum number of characters of command output copied into an `output`
/// event.
pub const OUTPUT_LOG_LIMIT: usize = 500;
/// Maximum number of characters of generated text copied into an
/// `llm_success` event.
pub const PREVIEW_LOG_LIMIT: usize = 200;

/// Snapshot of one finished session. Written once, never updated.
///
/// The filesystem representation is left to the caller so this crate stays
/// independent of the shell's node types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionRecord<Fs> {
    pub ts: String,
    pub sid: String,
    pub user: String,
    pub hostname: String,
    pub cwd: String,
    pub history: Vec<String>,
    pub fs: Fs,
}

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: String,
    pub session_id: String,
    pub client_ip: String,
    pub client_port: u16,
    #[serde(flatten)]
    pub event: SessionEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStart {
        transport: String,
    },
    AuthAttempt {
        username: String,
        password: String,
        success: bool,
    },
    Command {
        cmd: String,
        cwd: String,
    },
    Output {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
        out: String,
        code: i32,
    },
    LlmSuccess {
        cmd: String,
        response_preview: String,
    },
    LlmEmpty {
        cmd: String,
    },
    LlmTimeout {
        cmd: String,
    },
    LlmConnectionError {
        cmd: String,
        error: String,
    },
    LlmError {
        cmd: String,
        error: String,
        details: String,
    },
    SessionEnd,
    SessionSaved {
        path: String,
    },
    SessionSaveFailed {
        error: String,
    },
    SendFailed {
        stage: String,
        error: String,
    },
    ReadFailed {
        error: String,
    },
    #[serde(rename = "ssh_negotiation_failed")]
    NegotiationFailed {
        error: String,
    },
    NoChannel {
        reason: String,
    },
    NoShellRequest,
}

impl SessionEvent {
    /// Builds an `output` event with the output truncated to
    /// [`OUTPUT_LOG_LIMIT`] characters.
    #[must_use]
    pub fn output(cmd: Option<&str>, out: &str, code: i32) -> Self {
        Self::Output {
            cmd: cmd.map(str::to_string),
            out: truncate_chars(out, OUTPUT_LOG_LIMIT),
            code,
        }
    }

    /// Builds an `llm_success` event with a preview truncated to
    /// [`PREVIEW_LOG_LIMIT`] characters.
    #[must_use]
    pub fn llm_success(cmd: &str, response: &str) -> Self {
        Self::LlmSuccess {
            cmd: cmd.to_string(),
            response_preview: truncate_chars(response, PREVIEW_LOG_LIMIT),
        }
    }

    /// The `type` tag this event serializes with.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SessionStart { .. } => "session_start",
            Self::AuthAttempt { .. } => "auth_attempt",
            Self::Command { .. } => "command",
            Self::Output { .. } => "output",
            Self::LlmSuccess { .. } => "llm_success",
            Self::LlmEmpty { .. } => "llm_empty",
            Self::LlmTimeout { .. } => "llm_timeout",
            Self::LlmConnectionError { .. } => "llm_connection_error",
            Self::LlmError { .. } => "llm_error",
            Self::SessionEnd => "session_end",
            Self::SessionSaved { .. } => "session_saved",
            Self::SessionSaveFailed { .. } => "session_save_failed",
            Self::SendFailed { .. } => "send_failed",
            Self::ReadFailed { .. } => "read_failed",
            Self::NegotiationFailed { .. } => "ssh_negotiation_failed",
            Self::NoChannel { .. } => "no_channel",
            Self::NoShellRequest => "no_shell_request",
        }
    }
}

fn truncate_chars(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((index, _)) => value[..index].to_string(),
        None => value.to_string(),
    }
}
