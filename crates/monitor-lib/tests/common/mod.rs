//! Fake container runtime for integration tests
//!
//! Serves a scripted HTTP/1.1 API over a unix socket in a temp directory and
//! records every request it sees. Stream responses are written as chunked
//! bodies, one frame per chunk, and can end cleanly (terminating chunk) or
//! by dropping the connection to simulate a stream drop.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub enum FakeBody {
    Empty,
    Json(String),
    /// Chunked stream of lines; `clean_end` controls whether the body is
    /// terminated properly or the connection is dropped mid-stream.
    Stream {
        lines: Vec<String>,
        clean_end: bool,
        delay: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub status: u16,
    pub body: FakeBody,
}

impl FakeResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: FakeBody::Json(body.into()),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: FakeBody::Empty,
        }
    }

    pub fn stream(lines: Vec<String>, clean_end: bool) -> Self {
        Self {
            status: 200,
            body: FakeBody::Stream {
                lines,
                clean_end,
                delay: Duration::from_millis(10),
            },
        }
    }
}

type Handler = dyn Fn(&RecordedRequest) -> FakeResponse + Send + Sync;

pub struct FakeDocker {
    socket_path: PathBuf,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    accept_task: JoinHandle<()>,
    _dir: TempDir,
}

impl FakeDocker {
    pub fn start(handler: impl Fn(&RecordedRequest) -> FakeResponse + Send + Sync + 'static) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let socket_path = dir.path().join("docker.sock");
        let listener = UnixListener::bind(&socket_path).expect("bind unix socket");
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let accept_requests = Arc::clone(&requests);
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _addr)) = listener.accept().await else {
                    break;
                };
                let requests = Arc::clone(&accept_requests);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let _ = serve_connection(stream, requests, handler).await;
                });
            }
        });

        Self {
            socket_path,
            requests,
            accept_task,
            _dir: dir,
        }
    }

    pub fn socket_path(&self) -> &std::path::Path {
        &self.socket_path
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests matching `method` and `path`, ignoring the query string.
    pub fn requests_for(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

impl Drop for FakeDocker {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve_connection(
    mut stream: UnixStream,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handler: Arc<Handler>,
) -> std::io::Result<()> {
    while let Some(request) = read_request(&mut stream).await? {
        requests.lock().unwrap().push(request.clone());
        let response = handler(&request);
        write_response(&mut stream, response).await?;
    }
    Ok(())
}

async fn read_request(stream: &mut UnixStream) -> std::io::Result<Option<RecordedRequest>> {
    let mut buf: Vec<u8> = Vec::new();
    let header_end = loop {
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos;
        }
        let mut chunk = [0u8; 1024];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default();
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target.to_string(), String::new()),
    };

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let mut chunk = [0u8; 1024];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Some(RecordedRequest {
        method,
        path,
        query,
        body: String::from_utf8_lossy(&body).to_string(),
    }))
}

async fn write_response(stream: &mut UnixStream, response: FakeResponse) -> std::io::Result<()> {
    let reason = match response.status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "Unknown",
    };

    match response.body {
        FakeBody::Empty => {
            let head = format!(
                "HTTP/1.1 {} {reason}\r\nContent-Length: 0\r\n\r\n",
                response.status
            );
            stream.write_all(head.as_bytes()).await?;
        }
        FakeBody::Json(body) => {
            let head = format!(
                "HTTP/1.1 {} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                response.status,
                body.len()
            );
            stream.write_all(head.as_bytes()).await?;
            stream.write_all(body.as_bytes()).await?;
        }
        FakeBody::Stream {
            lines,
            clean_end,
            delay,
        } => {
            let head = format!(
                "HTTP/1.1 {} {reason}\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n",
                response.status
            );
            stream.write_all(head.as_bytes()).await?;
            for line in lines {
                let data = format!("{line}\n");
                let chunk = format!("{:x}\r\n{data}\r\n", data.len());
                stream.write_all(chunk.as_bytes()).await?;
                stream.flush().await?;
                tokio::time::sleep(delay).await;
            }
            if clean_end {
                stream.write_all(b"0\r\n\r\n").await?;
            }
            // Either way the connection is done; dropping it here simulates
            // the drop for the unclean case.
            stream.shutdown().await?;
        }
    }
    Ok(())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// A stats frame with the given timestamp second and known counters.
///
/// Deltas are cpu=100, system=1000 over 4 cpus (40% cpu), memory 1000 with
/// cache 200 (800 used).
pub fn stats_frame(seconds: u32) -> String {
    serde_json::json!({
        "read": format!("2024-05-01T12:00:{seconds:02}Z"),
        "cpu_stats": {
            "cpu_usage": { "total_usage": 600u64 },
            "system_cpu_usage": 3000u64,
            "online_cpus": 4,
        },
        "precpu_stats": {
            "cpu_usage": { "total_usage": 500u64 },
            "system_cpu_usage": 2000u64,
        },
        "memory_stats": {
            "usage": 1000u64,
            "stats": { "cache": 200u64 },
        },
    })
    .to_string()
}
