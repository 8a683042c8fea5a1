//! Connection-facing pieces: the transport seam, the plain TCP login
//! transport and the raw-input line editor.

pub mod line_editor;
pub mod tcp_login;
pub mod transport;

pub use line_editor::{LineEditor, ReadOutcome};
pub use tcp_login::{Credentials, TcpLoginTransport};
pub use transport::{ProtocolError, Transport};
