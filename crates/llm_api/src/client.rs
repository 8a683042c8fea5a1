use reqwest::Client;

use crate::config::LlmApiConfig;
use crate::error::{parse_error_message, LlmApiError};
use crate::payload::{GenerateRequest, GenerateResponse};
use crate::url::normalize_generate_url;

#[derive(Debug, Clone)]
pub struct LlmApiClient {
    http: Client,
    config: LlmApiConfig,
}

impl LlmApiClient {
    pub fn new(config: LlmApiConfig) -> Result<Self, LlmApiError> {
        if config.model.trim().is_empty() {
            return Err(LlmApiError::MissingModel);
        }
        reqwest::Url::parse(&normalize_generate_url(&config.base_url))
            .map_err(|error| LlmApiError::InvalidBaseUrl(format!("{}: {error}", config.base_url)))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(LlmApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LlmApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_generate_url(&self.config.base_url)
    }

    /// Wraps `prompt` in a request carrying the configured model and options.
    pub fn request_for(&self, prompt: impl Into<String>) -> GenerateRequest {
        GenerateRequest::new(self.config.model.clone(), prompt)
            .with_options(self.config.options.clone())
    }

    pub fn build_request(&self, request: &GenerateRequest) -> reqwest::RequestBuilder {
        let mut payload = request.clone();
        payload.stream = false;
        self.http.post(self.normalized_endpoint()).json(&payload)
    }

    /// Sends one generate request and returns the decoded reply.
    ///
    /// There is no retry: a single attempt bounded by the client timeout.
    pub async fn send(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmApiError> {
        let response = self.build_request(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            return Err(LlmApiError::Status(status, parse_error_message(status, &body)));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice::<GenerateResponse>(&body)?)
    }

    /// Convenience wrapper: builds the request for `prompt` and returns only
    /// the generated text (possibly empty).
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmApiError> {
        let request = self.request_for(prompt);
        let response = self.send(&request).await?;
        Ok(response.text().to_string())
    }
}
