//! Per-connection lifecycle.
//!
//! `Connecting -> Authenticating -> AwaitingShell -> Interactive -> Closing ->
//! Closed`. Any protocol failure or disconnect jumps straight to `Closing`,
//! which always logs `session_end`, persists the session if it reached the
//! shell, and releases the channel and transport.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use session_store::{now_rfc3339, EventLog, SessionEvent, SessionStore};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::core::seed::FsTemplate;
use crate::core::session::{Identity, SessionState};
use crate::logging::SessionLogger;
use crate::platform::line_editor::ReadOutcome;
use crate::platform::transport::Transport;
use crate::shell::{Dispatcher, TextGenerator};

pub const CHANNEL_TIMEOUT: Duration = Duration::from_secs(20);
pub const SHELL_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const BANNER: &str = "Welcome to Ubuntu 22.04.4 LTS (GNU/Linux 5.15.0-xx-generic x86_64)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Authenticating,
    AwaitingShell,
    Interactive,
    Closing,
    Closed,
}

/// Why the session left its last live phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    NegotiationFailed,
    NoChannel,
    NoShellRequest,
    Logout,
    Disconnected,
    ReadFailed,
    SendFailed,
    TransportInactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub channel_timeout: Duration,
    pub shell_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            channel_timeout: CHANNEL_TIMEOUT,
            shell_timeout: SHELL_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session_id: String,
    pub reason: EndReason,
    /// Every phase entered, in order, ending with `Closed`.
    pub phases: Vec<SessionPhase>,
    pub saved: Option<PathBuf>,
}

/// Everything a session needs that outlives it. Shared read-only between
/// sessions.
#[derive(Debug)]
pub struct SessionContext<G> {
    pub identity: Identity,
    pub template: FsTemplate,
    pub dispatcher: Dispatcher<G>,
    pub events: Arc<EventLog>,
    pub store: SessionStore,
    pub limits: SessionLimits,
}

struct PhaseTracker {
    session_id: String,
    phases: Vec<SessionPhase>,
}

impl PhaseTracker {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            phases: vec![SessionPhase::Connecting],
        }
    }

    fn advance(&mut self, next: SessionPhase) {
        tracing::debug!(session_id = %self.session_id, phase = ?next, "session phase");
        self.phases.push(next);
    }
}

impl<G: TextGenerator> SessionContext<G> {
    pub async fn run_session<T: Transport>(&self, mut transport: T) -> SessionOutcome {
        let session_id = Uuid::new_v4().to_string();
        let peer = transport.peer_addr();
        let logger = SessionLogger::new(Arc::clone(&self.events), session_id.as_str(), peer);
        let mut tracker = PhaseTracker::new(&session_id);

        tracing::info!(session_id = %session_id, %peer, transport = transport.kind(), "session started");
        logger.emit(SessionEvent::SessionStart {
            transport: transport.kind().to_string(),
        });

        let mut channel = None;
        let mut state = None;
        let reason = self
            .drive(&mut transport, &mut channel, &mut state, &logger, &mut tracker)
            .await;

        tracker.advance(SessionPhase::Closing);
        logger.emit(SessionEvent::SessionEnd);
        let saved = match state {
            Some(state) => self.persist(state, &logger).await,
            None => None,
        };
        if let Some(mut channel) = channel {
            let _ = channel.shutdown().await;
        }
        transport.close().await;
        tracker.advance(SessionPhase::Closed);

        tracing::info!(session_id = %session_id, ?reason, "session closed");
        SessionOutcome {
            session_id,
            reason,
            phases: tracker.phases,
            saved,
        }
    }

    async fn drive<T: Transport>(
        &self,
        transport: &mut T,
        channel_slot: &mut Option<T::Channel>,
        state_slot: &mut Option<SessionState>,
        logger: &SessionLogger,
        tracker: &mut PhaseTracker,
    ) -> EndReason {
        if let Err(error) = transport.handshake().await {
            logger.emit(SessionEvent::NegotiationFailed {
                error: error.to_string(),
            });
            return EndReason::NegotiationFailed;
        }

        tracker.advance(SessionPhase::Authenticating);
        let accepted =
            tokio::time::timeout(self.limits.channel_timeout, transport.accept_channel(logger))
                .await;
        let channel = match accepted {
            Ok(Ok(channel)) => channel,
            Ok(Err(error)) => {
                logger.emit(SessionEvent::NoChannel {
                    reason: error.to_string(),
                });
                return EndReason::NoChannel;
            }
            Err(_) => {
                logger.emit(SessionEvent::NoChannel {
                    reason: "timed out waiting for channel".to_string(),
                });
                return EndReason::NoChannel;
            }
        };
        let channel = channel_slot.insert(channel);

        tracker.advance(SessionPhase::AwaitingShell);
        let requested =
            tokio::time::timeout(self.limits.shell_timeout, transport.wait_shell_request()).await;
        if !matches!(requested, Ok(Ok(()))) {
            logger.emit(SessionEvent::NoShellRequest);
            return EndReason::NoShellRequest;
        }

        tracker.advance(SessionPhase::Interactive);
        let state = state_slot.insert(SessionState::new(self.identity.clone(), &self.template));
        self.interact(transport, channel, state, logger).await
    }

    async fn interact<T: Transport>(
        &self,
        transport: &mut T,
        channel: &mut T::Channel,
        state: &mut SessionState,
        logger: &SessionLogger,
    ) -> EndReason {
        let (reader, mut writer) = tokio::io::split(channel);
        let mut reader = BufReader::new(reader);
        let mut editor = transport.take_line_editor();

        let last_login = now_rfc3339().unwrap_or_default();
        let banner = format!("{BANNER}\r\nLast login: {last_login}\r\n\r\n");
        if let Err(error) = send(&mut writer, &banner).await {
            logger.emit(SessionEvent::SendFailed {
                stage: "banner".to_string(),
                error: error.to_string(),
            });
            return EndReason::SendFailed;
        }

        loop {
            if !transport.is_active() {
                return EndReason::TransportInactive;
            }
            if let Err(error) = send(&mut writer, &state.prompt()).await {
                logger.emit(SessionEvent::SendFailed {
                    stage: "prompt".to_string(),
                    error: error.to_string(),
                });
                return EndReason::SendFailed;
            }

            let line = match editor.read_line(&mut reader, &mut writer).await {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Disconnected => return EndReason::Disconnected,
                ReadOutcome::ReadFailed(error) => {
                    logger.emit(SessionEvent::ReadFailed {
                        error: error.to_string(),
                    });
                    return EndReason::ReadFailed;
                }
            };
            let command = line.trim();
            if command.is_empty() {
                continue;
            }

            state.add_history(command);
            logger.emit(SessionEvent::Command {
                cmd: command.to_string(),
                cwd: state.cwd().to_string(),
            });

            let result = self.dispatcher.dispatch(state, command, logger).await;

            if !result.output.is_empty() {
                if let Err(error) = send(&mut writer, &to_crlf(&result.output)).await {
                    logger.emit(SessionEvent::SendFailed {
                        stage: "output".to_string(),
                        error: error.to_string(),
                    });
                    return EndReason::SendFailed;
                }
            }

            if result.logout {
                logger.emit(SessionEvent::output(None, &result.output, result.exit_code));
                return EndReason::Logout;
            }
            logger.emit(SessionEvent::output(
                Some(command),
                &result.output,
                result.exit_code,
            ));
        }
    }

    async fn persist(&self, state: SessionState, logger: &SessionLogger) -> Option<PathBuf> {
        let ts = match now_rfc3339() {
            Ok(ts) => ts,
            Err(error) => {
                logger.emit(SessionEvent::SessionSaveFailed {
                    error: error.to_string(),
                });
                return None;
            }
        };
        let record = state.into_record(logger.session_id(), ts);
        let store = self.store.clone();

        let saved = tokio::task::spawn_blocking(move || store.save(&record)).await;
        match saved {
            Ok(Ok(path)) => {
                logger.emit(SessionEvent::SessionSaved {
                    path: path.display().to_string(),
                });
                Some(path)
            }
            Ok(Err(error)) => {
                tracing::warn!(session_id = logger.session_id(), %error, "session snapshot not written");
                logger.emit(SessionEvent::SessionSaveFailed {
                    error: error.to_string(),
                });
                None
            }
            Err(error) => {
                logger.emit(SessionEvent::SessionSaveFailed {
                    error: error.to_string(),
                });
                None
            }
        }
    }
}

/// Converts internal line endings, including a lone `\r`, to the wire's
/// `\r\n`.
pub fn to_crlf(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\r\n")
}

async fn send<W>(writer: &mut W, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await
}
