//! Session lifecycle and the accept loop.

pub mod server;
pub mod session;

pub use server::Server;
pub use session::{
    to_crlf, EndReason, SessionContext, SessionLimits, SessionOutcome, SessionPhase,
};
