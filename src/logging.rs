//! Structured event sink for a single session, plus process-wide tracing
//! setup.
//!
//! Event log writes never fail the session: a record that cannot be written
//! is reported through `tracing` and dropped.

use std::net::SocketAddr;
use std::sync::Arc;

use session_store::{now_rfc3339, EventLog, EventRecord, SessionEvent};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Stamps events with time, session id and peer before appending them.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    log: Arc<EventLog>,
    session_id: String,
    peer: SocketAddr,
}

impl SessionLogger {
    pub fn new(log: Arc<EventLog>, session_id: impl Into<String>, peer: SocketAddr) -> Self {
        Self {
            log,
            session_id: session_id.into(),
            peer,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn emit(&self, event: SessionEvent) {
        let timestamp = match now_rfc3339() {
            Ok(timestamp) => timestamp,
            Err(error) => {
                tracing::warn!(session_id = %self.session_id, %error, "cannot timestamp session event");
                return;
            }
        };
        let record = EventRecord {
            timestamp,
            session_id: self.session_id.clone(),
            client_ip: self.peer.ip().to_string(),
            client_port: self.peer.port(),
            event,
        };

        tracing::debug!(
            session_id = %self.session_id,
            event = record.event.type_name(),
            "session event"
        );
        if let Err(error) = self.log.append(&record) {
            tracing::warn!(
                session_id = %self.session_id,
                event = record.event.type_name(),
                %error,
                "failed to append session event"
            );
        }
    }
}
