//! Routes a submitted line through the command tiers.

use std::collections::BTreeSet;

use crate::core::session::SessionState;
use crate::logging::SessionLogger;
use crate::shell::builtins::quick_command;
use crate::shell::fallback::{FallbackAdapter, TextGenerator};
use crate::shell::fs_commands::{filesystem_command, missing_cat_target};
use crate::shell::CommandResult;

/// Commands never emulated locally: interpreters, archivers, compilers,
/// remote-access and system administration tools.
pub const DEFAULT_COMPLEX_COMMANDS: &[&str] = &[
    "curl", "wget", "nc", "ncat", "socat", "telnet", "sed", "awk", "perl", "python", "ruby",
    "bash", "find", "locate", "updatedb", "tar", "gzip", "bzip2", "zip", "unzip", "gcc", "make",
    "cmake", "g++", "docker", "kubectl", "systemctl", "journalctl", "ssh", "scp", "rsync", "nm",
    "objdump", "strings",
];

#[derive(Debug)]
pub struct Dispatcher<G> {
    fallback: FallbackAdapter<G>,
    complex_commands: BTreeSet<String>,
}

impl<G: TextGenerator> Dispatcher<G> {
    pub fn new(fallback: FallbackAdapter<G>) -> Self {
        Self {
            fallback,
            complex_commands: DEFAULT_COMPLEX_COMMANDS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }

    pub fn with_complex_commands<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.complex_commands = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn fallback(&self) -> &FallbackAdapter<G> {
        &self.fallback
    }

    /// True when the line's command name goes straight to the fallback.
    pub fn is_complex(&self, line: &str) -> bool {
        line.split_whitespace()
            .next()
            .is_some_and(|name| self.complex_commands.contains(name))
    }

    pub async fn dispatch(
        &self,
        state: &mut SessionState,
        line: &str,
        logger: &SessionLogger,
    ) -> CommandResult {
        let line = line.trim();
        if matches!(line, "exit" | "logout") {
            return CommandResult::logout();
        }

        if !self.is_complex(line) {
            if let Some(result) = quick_command(state, line) {
                return result;
            }
            if let Some(result) = filesystem_command(state, line) {
                return result;
            }
        }

        let materialize = missing_cat_target(state, line);
        let result = self.fallback.reply(state, line, logger).await;

        if let Some(path) = materialize {
            if result.exit_code == 0 {
                let content = result.output.trim();
                if let Err(error) = state.fs_mut().write_file(&path, content) {
                    tracing::debug!(
                        session_id = logger.session_id(),
                        path = %path,
                        %error,
                        "generated file not materialized"
                    );
                }
            }
        }
        result
    }
}
