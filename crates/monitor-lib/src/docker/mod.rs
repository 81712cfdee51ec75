//! Thin client for the container runtime's local HTTP API
//!
//! Speaks HTTP/1.1 over the runtime's unix socket. Every operation opens a
//! fresh connection; the stats stream keeps its connection alive for the
//! lifetime of the stream.

mod stream;

pub use stream::StatsStream;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

/// Errors surfaced by runtime API calls
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime endpoint could not be reached at all.
    #[error("container runtime unreachable at `{socket}`: {source}")]
    Unavailable {
        socket: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The runtime answered with a non-success status.
    #[error("{operation} failed for container `{container}` with status {status}")]
    OperationFailed {
        operation: &'static str,
        container: String,
        status: StatusCode,
    },

    #[error("transport error talking to container runtime: {0}")]
    Transport(#[from] hyper::Error),

    #[error("invalid runtime request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("unexpected runtime response body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

/// Summary entry from the runtime's container list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: Vec<String>,
    #[serde(rename = "State", default)]
    pub state: String,
}

/// Creation parameters for a new container
#[derive(Debug, Clone, Serialize)]
pub struct ContainerSpec {
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "HostConfig")]
    pub host_config: HostConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostConfig {
    #[serde(rename = "Binds")]
    pub binds: Vec<String>,
}

/// Client for the container runtime API on a unix socket
#[derive(Debug, Clone)]
pub struct DockerClient {
    socket: PathBuf,
}

impl DockerClient {
    /// Create a client for the runtime socket at `socket`.
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    /// Path of the runtime socket this client talks to.
    pub fn socket_path(&self) -> &Path {
        &self.socket
    }

    /// List containers whose name matches `name` exactly.
    ///
    /// With `exited_only` the query is additionally filtered to exited
    /// containers; without it, only running containers are returned.
    pub async fn list_containers(
        &self,
        name: &str,
        exited_only: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let mut filters = serde_json::json!({ "name": [name] });
        if exited_only {
            filters["status"] = serde_json::json!(["exited"]);
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("filters", &filters.to_string())
            .finish();
        let request = get_request(&format!("/containers/json?{query}"))?;
        let body = self.call("list", name, request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Create a container named `name` from `spec`.
    pub async fn create_container(
        &self,
        name: &str,
        spec: &ContainerSpec,
    ) -> Result<(), RuntimeError> {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("name", name)
            .finish();
        let body = serde_json::to_vec(spec)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/containers/create?{query}"))
            .header(header::HOST, "docker")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::from(body))?;
        self.call("create", name, request).await.map(drop)
    }

    /// Start the container named `name`.
    pub async fn start_container(&self, name: &str) -> Result<(), RuntimeError> {
        let request = post_request(&format!("/containers/{name}/start"))?;
        self.call("start", name, request).await.map(drop)
    }

    /// Stop the container named `name`.
    pub async fn stop_container(&self, name: &str) -> Result<(), RuntimeError> {
        let request = post_request(&format!("/containers/{name}/stop"))?;
        self.call("stop", name, request).await.map(drop)
    }

    /// Delete the container named `name`.
    pub async fn remove_container(&self, name: &str) -> Result<(), RuntimeError> {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/containers/{name}"))
            .header(header::HOST, "docker")
            .body(Full::default())?;
        self.call("delete", name, request).await.map(drop)
    }

    /// Open the live stats stream for `target`.
    ///
    /// The runtime keeps the response body open, emitting one JSON frame per
    /// line until the target stops or the connection drops.
    pub async fn stats_stream(&self, target: &str) -> Result<StatsStream, RuntimeError> {
        let request = get_request(&format!("/containers/{target}/stats"))?;
        let (response, conn) = self.send(request).await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            conn.abort();
            return Err(RuntimeError::OperationFailed {
                operation: "stats",
                container: target.to_owned(),
                status,
            });
        }
        Ok(StatsStream::new(response.into_body(), conn))
    }

    /// Dispatch a unary request and collect the full response body.
    async fn call(
        &self,
        operation: &'static str,
        container: &str,
        request: Request<Full<Bytes>>,
    ) -> Result<Bytes, RuntimeError> {
        let (response, _conn) = self.send(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        if status.is_client_error() || status.is_server_error() {
            return Err(RuntimeError::OperationFailed {
                operation,
                container: container.to_owned(),
                status,
            });
        }
        Ok(body)
    }

    /// Connect to the socket and send one request.
    ///
    /// The returned join handle drives the connection; it finishes on its own
    /// for unary calls and is aborted by `StatsStream` on drop.
    async fn send(
        &self,
        request: Request<Full<Bytes>>,
    ) -> Result<(Response<Incoming>, JoinHandle<()>), RuntimeError> {
        let stream =
            UnixStream::connect(&self.socket)
                .await
                .map_err(|source| RuntimeError::Unavailable {
                    socket: self.socket.clone(),
                    source,
                })?;
        let (mut sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
        let conn = tokio::spawn(async move {
            if let Err(err) = conn.await {
                tracing::debug!(error = %err, "runtime connection terminated");
            }
        });
        let response = sender.send_request(request).await?;
        Ok((response, conn))
    }
}

fn get_request(uri: &str) -> Result<Request<Full<Bytes>>, RuntimeError> {
    Ok(Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::HOST, "docker")
        .body(Full::default())?)
}

fn post_request(uri: &str) -> Result<Request<Full<Bytes>>, RuntimeError> {
    Ok(Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::HOST, "docker")
        .body(Full::default())?)
}
