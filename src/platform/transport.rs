//! The seam between a network protocol and the shell session.
//!
//! A transport negotiates, authenticates and finally hands over one
//! interactive byte channel. Everything after that is protocol-agnostic.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::logging::SessionLogger;
use crate::platform::line_editor::LineEditor;

/// Failures that end a session before or outside the interactive loop.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("negotiation failed: {0}")]
    Negotiation(String),
    #[error("authentication failed after {attempts} attempts")]
    AuthenticationFailed { attempts: usize },
    #[error("client requested no shell")]
    NoShell,
    #[error("channel closed by peer")]
    ChannelClosed,
    #[error("channel I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One accepted connection.
///
/// Calls happen in order: [`handshake`](Transport::handshake), then
/// [`accept_channel`](Transport::accept_channel), then
/// [`wait_shell_request`](Transport::wait_shell_request). The caller bounds
/// the last two with its own timeouts. [`close`](Transport::close) runs on
/// every exit path.
pub trait Transport: Send {
    type Channel: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Short label recorded in the `session_start` event.
    fn kind(&self) -> &'static str;

    fn peer_addr(&self) -> SocketAddr;

    fn handshake(&mut self) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Authenticates the client and opens the interactive channel. Credential
    /// attempts are reported through `logger`.
    fn accept_channel(
        &mut self,
        logger: &SessionLogger,
    ) -> impl Future<Output = Result<Self::Channel, ProtocolError>> + Send;

    fn wait_shell_request(&mut self) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Editor for the interactive loop. Transports that read lines during
    /// authentication hand over their editor so pending input state carries
    /// into the shell.
    fn take_line_editor(&mut self) -> LineEditor {
        LineEditor::new()
    }

    fn is_active(&self) -> bool;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
