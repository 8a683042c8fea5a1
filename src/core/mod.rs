//! Session data: the virtual filesystem, its template and per-session state.

pub mod seed;
pub mod session;
pub mod vfs;
