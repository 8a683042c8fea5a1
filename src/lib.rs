//! Interactive shell decoy.
//!
//! Accepts authenticated connections and gives each one a simulated login
//! shell backed by a private in-memory filesystem. Commands resolve through
//! deterministic built-ins, filesystem operations, and finally a generative
//! text service. Every session event is appended to a JSON-lines log and the
//! final session state is written to disk when the connection ends.
//!
//! # Layout
//! - [`core`]: virtual filesystem, decoy template, session state.
//! - [`shell`]: command tiers and the [`Dispatcher`].
//! - [`platform`]: the [`Transport`] seam, the plain TCP login transport and
//!   the raw-input [`LineEditor`].
//! - [`runtime`]: the session state machine and the accept loop.

pub mod config;
pub mod logging;

pub mod core;
pub mod platform;
pub mod runtime;
pub mod shell;

pub use crate::config::{ConfigError, EnvConfig};
pub use crate::core::seed::FsTemplate;
pub use crate::core::session::{Identity, SessionState};
pub use crate::core::vfs::{normalize, FsError, FsNode, VirtualFs};
pub use crate::logging::{init_tracing, SessionLogger};
pub use crate::platform::{
    Credentials, LineEditor, ProtocolError, ReadOutcome, TcpLoginTransport, Transport,
};
pub use crate::runtime::{
    EndReason, Server, SessionContext, SessionLimits, SessionOutcome, SessionPhase,
};
pub use crate::shell::{
    CommandResult, Dispatcher, FallbackAdapter, GenerateError, TextGenerator,
};
