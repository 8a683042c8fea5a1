use std::time::Duration;

use crate::payload::SamplingOptions;
use crate::url::DEFAULT_BASE_URL;

/// Transport configuration for generate requests.
#[derive(Debug, Clone)]
pub struct LlmApiConfig {
    /// Base URL for the service; normalized to the generate endpoint.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Sampling parameters sent with every request.
    pub options: SamplingOptions,
    /// Optional request timeout enforced by the HTTP client.
    pub timeout: Option<Duration>,
}

impl Default for LlmApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "mistral:latest".to_string(),
            options: SamplingOptions::default(),
            timeout: None,
        }
    }
}

impl LlmApiConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }
}
