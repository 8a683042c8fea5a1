use llm_api::{normalize_generate_url, GenerateRequest, LlmApiClient, LlmApiConfig, LlmApiError};
use serde_json::Value;

#[test]
fn http_request_targets_generate_endpoint() {
    let config = LlmApiConfig::new("mistral:latest").with_base_url("http://127.0.0.1:11434");
    let client = LlmApiClient::new(config).expect("client");
    let request = client.request_for("Cmd: uptime\nOut:");

    let http_request = client
        .build_request(&request)
        .build()
        .expect("request");

    assert_eq!(
        http_request.url().as_str(),
        normalize_generate_url("http://127.0.0.1:11434")
    );
    assert_eq!(http_request.method(), "POST");
}

#[test]
fn http_request_body_is_non_streaming_with_sampling_options() {
    let client = LlmApiClient::new(LlmApiConfig::new("tiny")).expect("client");
    let mut request = GenerateRequest::new("tiny", "prompt text");
    request.stream = true;

    let http_request = client
        .build_request(&request)
        .build()
        .expect("request");
    let body = http_request
        .body()
        .and_then(|body| body.as_bytes())
        .expect("json body should be buffered");
    let json: Value = serde_json::from_slice(body).expect("body should be json");

    assert_eq!(json["model"], "tiny");
    assert_eq!(json["prompt"], "prompt text");
    assert_eq!(json["stream"], false);
    assert_eq!(json["options"]["num_predict"], 200);
    assert_eq!(json["options"]["top_k"], 20);
}

#[test]
fn client_rejects_blank_model() {
    let error = LlmApiClient::new(LlmApiConfig::new("  ")).expect_err("blank model");
    assert!(matches!(error, LlmApiError::MissingModel));
}

#[test]
fn client_rejects_unparseable_base_url() {
    let config = LlmApiConfig::new("m").with_base_url("not a url");
    let error = LlmApiClient::new(config).expect_err("bad url");
    assert!(matches!(error, LlmApiError::InvalidBaseUrl(_)));
}
