use serde::{Deserialize, Serialize};

/// Request payload for the generate endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Always false; the client reads one complete JSON reply.
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub options: SamplingOptions,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: false,
            options: SamplingOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }
}

/// Fixed sampling parameters. Defaults keep replies short and terse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    pub temperature: f64,
    pub num_predict: u32,
    pub top_k: u32,
    pub top_p: f64,
    pub repeat_penalty: f64,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            num_predict: 200,
            top_k: 20,
            top_p: 0.85,
            repeat_penalty: 1.05,
        }
    }
}

/// Non-streaming reply body. Only `response` is consumed; other fields
/// (timings, context) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: Option<String>,
}

impl GenerateResponse {
    #[must_use]
    pub fn text(&self) -> &str {
        self.response.as_deref().unwrap_or("")
    }
}
