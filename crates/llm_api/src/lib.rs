//! Transport-only client for a local generative text service.
//!
//! This crate owns request building, response decoding and error
//! classification for the `/api/generate` endpoint only. It knows nothing
//! about prompts, shells or sessions; callers hand it a finished prompt and
//! get the raw generated text back.
//!
//! Failures are surfaced as [`LlmApiError`] so callers can tell a timeout
//! from a refused connection from a malformed reply without string matching.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod url;

pub use client::LlmApiClient;
pub use config::LlmApiConfig;
pub use error::LlmApiError;
pub use payload::{GenerateRequest, GenerateResponse, SamplingOptions};
pub use url::normalize_generate_url;
