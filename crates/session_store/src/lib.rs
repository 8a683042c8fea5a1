//! Durable storage for decoy sessions.
//!
//! Two sinks live here: the append-only JSON-lines [`EventLog`] shared by all
//! sessions, and the [`SessionStore`] that writes one immutable snapshot file
//! per finished session.

mod clock;
mod error;
mod event_log;
mod paths;
mod schema;
mod store;

pub use clock::now_rfc3339;
pub use error::SessionStoreError;
pub use event_log::EventLog;
pub use paths::{session_file_name, session_root, EVENT_LOG_FILE};
pub use schema::{EventRecord, SessionEvent, SessionRecord, OUTPUT_LOG_LIMIT, PREVIEW_LOG_LIMIT};
pub use store::SessionStore;
