//! Accept loop.
//!
//! Each accepted connection runs in its own task. A semaphore caps how many
//! sessions are alive at once; the loop stops accepting while it is
//! exhausted.

use std::io;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::platform::tcp_login::{Credentials, TcpLoginTransport};
use crate::runtime::session::SessionContext;
use crate::shell::TextGenerator;

pub struct Server<G> {
    listener: TcpListener,
    context: Arc<SessionContext<G>>,
    credentials: Credentials,
    permits: Arc<Semaphore>,
}

impl<G> Server<G>
where
    G: TextGenerator + 'static,
{
    pub fn new(
        listener: TcpListener,
        context: Arc<SessionContext<G>>,
        credentials: Credentials,
        max_sessions: usize,
    ) -> Self {
        Self {
            listener,
            context,
            credentials,
            permits: Arc::new(Semaphore::new(max_sessions.max(1))),
        }
    }

    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Sessions that could start right now without waiting.
    pub fn available_sessions(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs until the listener fails. Per-connection accept errors are logged
    /// and skipped.
    pub async fn serve(self) -> io::Result<()> {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "accepting connections");
        loop {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                return Ok(());
            };

            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(error) => {
                    tracing::warn!(%error, "accept failed");
                    continue;
                }
            };
            let _ = stream.set_nodelay(true);

            let transport = TcpLoginTransport::new(stream, peer, self.credentials.clone());
            let context = Arc::clone(&self.context);
            tokio::spawn(async move {
                let outcome = context.run_session(transport).await;
                tracing::debug!(session_id = %outcome.session_id, reason = ?outcome.reason, "session task finished");
                drop(permit);
            });
        }
    }
}
