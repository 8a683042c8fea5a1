//! Plain TCP transport with a `login:`/`Password:` exchange.
//!
//! There is no protocol negotiation and no separate shell request: once the
//! credentials match, the connection itself is the interactive channel.

use std::net::SocketAddr;

use session_store::SessionEvent;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::logging::SessionLogger;
use crate::platform::line_editor::{LineEditor, ReadOutcome};
use crate::platform::transport::{ProtocolError, Transport};

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

const LOGIN_PROMPT: &str = "login: ";
const PASSWORD_PROMPT: &str = "Password: ";
const LOGIN_INCORRECT: &str = "\r\nLogin incorrect\r\n";

/// The single accepted username/password pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

#[derive(Debug)]
pub struct TcpLoginTransport<S = TcpStream> {
    stream: Option<S>,
    peer: SocketAddr,
    credentials: Credentials,
    max_attempts: usize,
    active: bool,
    editor: Option<LineEditor>,
}

impl<S> TcpLoginTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(stream: S, peer: SocketAddr, credentials: Credentials) -> Self {
        Self {
            stream: Some(stream),
            peer,
            credentials,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            active: true,
            editor: None,
        }
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

impl<S> Transport for TcpLoginTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Channel = S;

    fn kind(&self) -> &'static str {
        "tcp-login"
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn handshake(&mut self) -> Result<(), ProtocolError> {
        if self.stream.is_some() {
            Ok(())
        } else {
            Err(ProtocolError::Negotiation("connection already consumed".to_string()))
        }
    }

    async fn accept_channel(&mut self, logger: &SessionLogger) -> Result<S, ProtocolError> {
        let mut stream = self.stream.take().ok_or(ProtocolError::ChannelClosed)?;
        match login(&mut stream, &self.credentials, self.max_attempts, logger).await {
            Ok(editor) => {
                self.editor = Some(editor);
                Ok(stream)
            }
            Err(error) => {
                self.active = false;
                let _ = stream.shutdown().await;
                Err(error)
            }
        }
    }

    async fn wait_shell_request(&mut self) -> Result<(), ProtocolError> {
        if self.active {
            Ok(())
        } else {
            Err(ProtocolError::NoShell)
        }
    }

    fn take_line_editor(&mut self) -> LineEditor {
        self.editor.take().unwrap_or_default()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    async fn close(&mut self) {
        self.active = false;
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }
}

/// Runs the credential exchange. On success returns the editor so the shell
/// continues from the same input state, e.g. a pending LF after the final CR.
async fn login<S>(
    stream: &mut S,
    credentials: &Credentials,
    max_attempts: usize,
    logger: &SessionLogger,
) -> Result<LineEditor, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut editor = LineEditor::new();

    for _ in 0..max_attempts {
        send(&mut writer, LOGIN_PROMPT).await?;
        editor.set_echo(true);
        let username = read_field(&mut editor, &mut reader, &mut writer).await?;

        send(&mut writer, PASSWORD_PROMPT).await?;
        editor.set_echo(false);
        let password = read_field(&mut editor, &mut reader, &mut writer).await?;

        let success = credentials.matches(username.trim(), &password);
        logger.emit(SessionEvent::AuthAttempt {
            username,
            password,
            success,
        });
        if success {
            editor.set_echo(true);
            return Ok(editor);
        }
        send(&mut writer, LOGIN_INCORRECT).await?;
    }

    Err(ProtocolError::AuthenticationFailed {
        attempts: max_attempts,
    })
}

/// A write the peer cannot receive means it has gone away.
async fn send<W>(writer: &mut W, text: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await
    };
    written.await.map_err(|error| {
        tracing::debug!(%error, "login write failed");
        ProtocolError::ChannelClosed
    })
}

async fn read_field<R, W>(
    editor: &mut LineEditor,
    reader: &mut R,
    writer: &mut W,
) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match editor.read_line(reader, writer).await {
        ReadOutcome::Line(line) => Ok(line),
        ReadOutcome::Disconnected => Err(ProtocolError::ChannelClosed),
        ReadOutcome::ReadFailed(error) => Err(ProtocolError::Io(error)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use session_store::EventLog;
    use tokio::io::{AsyncReadExt, DuplexStream};

    use super::*;

    fn logger(dir: &tempfile::TempDir) -> (SessionLogger, std::path::PathBuf) {
        let path = dir.path().join("events.jsonl");
        let log = Arc::new(EventLog::open(&path).expect("log"));
        let peer: SocketAddr = "198.51.100.7:60000".parse().expect("addr");
        (SessionLogger::new(log, "sid", peer), path)
    }

    fn transport(server: DuplexStream) -> TcpLoginTransport<DuplexStream> {
        let peer: SocketAddr = "198.51.100.7:60000".parse().expect("addr");
        TcpLoginTransport::new(server, peer, Credentials::new("user", "password"))
    }

    fn attempts(path: &std::path::Path) -> Vec<(String, bool)> {
        EventLog::read_all(path)
            .expect("read")
            .into_iter()
            .filter_map(|record| match record.event {
                SessionEvent::AuthAttempt {
                    username, success, ..
                } => Some((username, success)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn valid_credentials_open_the_channel() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (logger, path) = logger(&dir);
        let (mut client, server) = tokio::io::duplex(1024);
        let mut transport = transport(server);

        client.write_all(b"user\r\npassword\r\n").await.expect("write");
        transport.handshake().await.expect("handshake");
        let _channel = transport.accept_channel(&logger).await.expect("channel");
        transport.wait_shell_request().await.expect("shell");
        assert!(transport.is_active());

        let mut seen = vec![0u8; 64];
        let read = client.read(&mut seen).await.expect("read");
        let seen = String::from_utf8_lossy(&seen[..read]).to_string();
        assert!(seen.starts_with("login: user\r\nPassword: \r\n"));
        assert!(!seen.contains("password"));
        assert_eq!(attempts(&path), vec![("user".to_string(), true)]);
    }

    #[tokio::test]
    async fn shell_editor_continues_after_crlf_password() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (logger, _path) = logger(&dir);
        let (mut client, server) = tokio::io::duplex(1024);
        let mut transport = transport(server);

        client.write_all(b"user\r\npassword\r\n").await.expect("write");
        let mut channel = transport.accept_channel(&logger).await.expect("channel");
        let mut editor = transport.take_line_editor();
        client.write_all(b"ls\r").await.expect("write");

        let (mut reader, mut writer) = tokio::io::split(&mut channel);
        match editor.read_line(&mut reader, &mut writer).await {
            ReadOutcome::Line(line) => assert_eq!(line, "ls"),
            other => panic!("expected a line, got {other:?}"),
        }
        assert_eq!(editor.buffer(), "");
    }

    #[tokio::test]
    async fn three_wrong_attempts_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (logger, path) = logger(&dir);
        let (mut client, server) = tokio::io::duplex(4096);
        let mut transport = transport(server);

        client
            .write_all(b"root\rtoor\radmin\radmin\ruser\rwrong\r")
            .await
            .expect("write");
        let error = transport.accept_channel(&logger).await.expect_err("rejected");

        assert!(matches!(
            error,
            ProtocolError::AuthenticationFailed { attempts: 3 }
        ));
        assert!(!transport.is_active());
        assert!(transport.wait_shell_request().await.is_err());
        assert_eq!(attempts(&path).len(), 3);
    }

    #[tokio::test]
    async fn hangup_during_login_is_channel_closed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (logger, _path) = logger(&dir);
        let (mut client, server) = tokio::io::duplex(1024);
        let mut transport = transport(server);

        client.write_all(b"user\r").await.expect("write");
        drop(client);

        let error = transport.accept_channel(&logger).await.expect_err("closed");
        assert!(matches!(error, ProtocolError::ChannelClosed));
    }
}
