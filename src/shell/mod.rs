//! Command interpretation.
//!
//! A submitted line is resolved by three tiers in order: deterministic
//! built-ins, virtual filesystem commands, then the generative fallback.
//! Each tier returns `None` when it does not recognize the line.

pub mod builtins;
pub mod dispatch;
pub mod fallback;
pub mod fs_commands;
pub mod prompt;

pub use dispatch::{Dispatcher, DEFAULT_COMPLEX_COMMANDS};
pub use fallback::{FallbackAdapter, GenerateError, TextGenerator};

/// Text written back to the client plus the exit status it represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub output: String,
    pub exit_code: i32,
    /// Set by `exit`/`logout`; the session ends after this output is sent.
    pub logout: bool,
}

impl CommandResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self::with_code(output, 0)
    }

    pub fn with_code(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code,
            logout: false,
        }
    }

    pub fn logout() -> Self {
        Self {
            output: "logout\n".to_string(),
            exit_code: 0,
            logout: true,
        }
    }
}
