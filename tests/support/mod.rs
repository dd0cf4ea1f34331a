//! Shared test helpers: an in-process HTTP server with canned responses.
//!
//! Each request is matched against the routes in order; the first unused
//! route whose path prefixes the request path answers it (the last match is
//! reused once all are spent). Bodies are written in the given chunk sizes
//! with a short pause between writes, so clients really see split reads.

#![allow(dead_code)]

use hanzi_snap::Config;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub chunk_sizes: Vec<usize>,
}

impl MockResponse {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.into().into_bytes(),
            chunk_sizes: vec![usize::MAX],
        }
    }

    pub fn event_stream(body: impl Into<String>, chunk_sizes: &[usize]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            body: body.into().into_bytes(),
            chunk_sizes: chunk_sizes.to_vec(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
            chunk_sizes: vec![usize::MAX],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub body: String,
}

struct Route {
    prefix: &'static str,
    response: MockResponse,
    used: bool,
}

pub struct MockServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockServer {
    pub async fn start(routes: Vec<(&'static str, MockResponse)>) -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(Mutex::new(
            routes
                .into_iter()
                .map(|(prefix, response)| Route { prefix, response, used: false })
                .collect::<Vec<_>>(),
        ));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let captured = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let routes = routes.clone();
                let captured = captured.clone();
                tokio::spawn(async move {
                    serve(stream, routes, captured).await;
                });
            }
        });

        MockServer {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Config pointing both providers at this server, with test keys.
    pub fn config(&self) -> Config {
        Config {
            openai_key: Some("sk-test-0123456789".into()),
            google_cloud_vision_key: Some("AIza-test-0123456789".into()),
            openai_base_url: format!("{}/v1", self.base_url),
            vision_endpoint: format!("{}/v1/images:annotate", self.base_url),
            ocr_timeout_secs: 5,
            llm_timeout_secs: 5,
            ..Config::default()
        }
    }
}

async fn serve(mut stream: TcpStream, routes: Arc<Mutex<Vec<Route>>>, captured: Arc<Mutex<Vec<CapturedRequest>>>) {
    let Some(request) = read_request(&mut stream).await else { return };

    let response = {
        let mut routes = routes.lock().unwrap();
        let matching: Vec<usize> = routes
            .iter()
            .enumerate()
            .filter(|(_, r)| request.path.starts_with(r.prefix))
            .map(|(i, _)| i)
            .collect();
        let pick = matching
            .iter()
            .copied()
            .find(|&i| !routes[i].used)
            .or_else(|| matching.last().copied());
        pick.map(|i| {
            routes[i].used = true;
            routes[i].response.clone()
        })
    };
    captured.lock().unwrap().push(request);

    let response = response.unwrap_or_else(|| MockResponse::status(404, "{}"));
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n",
        response.status,
        if response.status < 400 { "OK" } else { "Error" },
        response.content_type
    );
    if stream.write_all(head.as_bytes()).await.is_err() {
        return;
    }

    let mut pos = 0;
    let mut i = 0;
    while pos < response.body.len() {
        let size = response.chunk_sizes[i % response.chunk_sizes.len()].max(1);
        let end = pos.saturating_add(size).min(response.body.len());
        if stream.write_all(&response.body[pos..end]).await.is_err() {
            return;
        }
        let _ = stream.flush().await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        pos = end;
        i += 1;
    }
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (header_end + content_length).min(buf.len());
    Some(CapturedRequest {
        path,
        body: String::from_utf8_lossy(&buf[header_end..body_end]).to_string(),
    })
}

/// SSE event carrying one content delta.
pub fn sse_delta(content: &str) -> String {
    let chunk = serde_json::json!({"choices": [{"delta": {"content": content}}]});
    format!("data: {}\n\n", chunk)
}

/// Full SSE body: one event per delta, then `[DONE]`.
pub fn sse_body(deltas: &[&str]) -> String {
    let mut body: String = deltas.iter().map(|d| sse_delta(d)).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

/// Non-streaming chat completion body with `content` as the reply.
pub fn completion_body(content: &str) -> String {
    serde_json::json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
}

pub fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
