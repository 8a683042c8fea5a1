use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use llm_api::{LlmApiClient, LlmApiConfig, LlmApiError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

fn allow_local_integration() -> bool {
    std::env::var("LLM_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
struct ScriptedResponse {
    delay_ms: u64,
    status: u16,
    body: &'static str,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_count = Arc::clone(&request_count);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            handle,
        }
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn respond(status: u16, body: &'static str) -> ScriptedResponse {
    ScriptedResponse {
        delay_ms: 0,
        status,
        body,
    }
}

#[tokio::test]
async fn generate_returns_response_text() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![respond(
        200,
        r#"{"model":"m","response":" 10:01:02 up 3 days\n","done":true}"#,
    )])
    .await;
    let client =
        LlmApiClient::new(LlmApiConfig::new("m").with_base_url(&server.base_url)).expect("client");

    let text = client.generate("uptime").await.expect("generate should succeed");

    assert_eq!(text, " 10:01:02 up 3 days\n");
    assert_eq!(server.request_count(), 1);
    server.shutdown();
}

#[tokio::test]
async fn generate_missing_response_field_is_empty_text() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![respond(200, r#"{"done":true}"#)]).await;
    let client =
        LlmApiClient::new(LlmApiConfig::new("m").with_base_url(&server.base_url)).expect("client");

    let text = client.generate("ls").await.expect("generate should succeed");

    assert!(text.is_empty());
    server.shutdown();
}

#[tokio::test]
async fn generate_surfaces_status_without_retry() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![
        respond(404, r#"{"error":"model \"m\" not found"}"#),
        respond(200, r#"{"response":"late"}"#),
    ])
    .await;
    let client =
        LlmApiClient::new(LlmApiConfig::new("m").with_base_url(&server.base_url)).expect("client");

    let error = client.generate("ls").await.expect_err("status should fail");

    assert!(matches!(error, LlmApiError::Status(code, ref message)
        if code.as_u16() == 404 && message.contains("not found")));
    assert_eq!(server.request_count(), 1);
    server.shutdown();
}

#[tokio::test]
async fn generate_malformed_body_is_decode_error() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![respond(200, "not json")]).await;
    let client =
        LlmApiClient::new(LlmApiConfig::new("m").with_base_url(&server.base_url)).expect("client");

    let error = client.generate("ls").await.expect_err("decode should fail");

    assert!(matches!(error, LlmApiError::Serde(_)));
    assert_eq!(error.kind(), "JSONDecodeError");
    server.shutdown();
}

#[tokio::test]
async fn generate_times_out_on_slow_service() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![ScriptedResponse {
        delay_ms: 2_000,
        status: 200,
        body: r#"{"response":"too late"}"#,
    }])
    .await;
    let config = LlmApiConfig::new("m")
        .with_base_url(&server.base_url)
        .with_timeout(Duration::from_millis(150));
    let client = LlmApiClient::new(config).expect("client");

    let error = client.generate("ls").await.expect_err("should time out");

    assert!(error.is_timeout(), "{error}");
    server.shutdown();
}

#[tokio::test]
async fn generate_reports_refused_connection() {
    if !allow_local_integration() {
        return;
    }

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("local TCP listener should bind");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);

    let client = LlmApiClient::new(LlmApiConfig::new("m").with_base_url(format!("http://{addr}")))
        .expect("client");

    let error = client.generate("ls").await.expect_err("nothing listens");

    assert!(error.is_connect(), "{error}");
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Error",
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
) {
    if read_request(&mut socket).await.is_err() {
        return;
    }

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| respond(500, r#"{"error":"unexpected request"}"#));

    if response.delay_ms > 0 {
        sleep(Duration::from_millis(response.delay_ms)).await;
    }

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        status_reason(response.status),
        response.body.len(),
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }
    let _ = socket.write_all(response.body.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(end) = find_header_end(&request) {
            let content_length = content_length(&request[..end]);
            while request.len() < end + content_length {
                let n = socket.read(&mut buffer).await?;
                if n == 0 {
                    return Ok(());
                }
                request.extend_from_slice(&buffer[..n]);
            }
            return Ok(());
        }
    }
}

fn find_header_end(request: &[u8]) -> Option<usize> {
    request
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|index| index + 4)
}

fn content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}
