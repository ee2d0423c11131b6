//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    response::IntoResponse,
    Json, Router,
};
use portal_proxy::config::endpoints::FileEndpointSource;
use portal_proxy::config::loader::load_config;
use portal_proxy::lifecycle::{Application, Shutdown};
use portal_proxy::proxy::ProxyService;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What the echo backend saw.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Start a backend that answers every request with an [`Echo`] of it, plus
/// a cookie and a private header the proxy must not pass back.
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new().fallback(|request: Request<Body>| async move {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, 1024 * 1024).await.unwrap_or_default();
        let echo = Echo {
            method: parts.method.to_string(),
            uri: parts.uri.to_string(),
            headers: parts
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect(),
            body: String::from_utf8_lossy(&body).into_owned(),
        };
        (
            [
                (header::SET_COOKIE, "session=upstream"),
                (header::HeaderName::from_static("x-upstream-secret"), "s3cr3t"),
            ],
            Json(echo),
        )
            .into_response()
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that sends one chunk of an event stream and then drops
/// the connection without finishing the chunked body.
pub async fn start_truncating_stream_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let chunk = "data: 1\n\n";
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n{}\r\n",
                            chunk.len(),
                            chunk
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// A running proxy backed by a temporary configuration file.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub proxy: Arc<ProxyService>,
    pub notifier: mpsc::UnboundedSender<()>,
    pub config: NamedTempFile,
    shutdown: Arc<Shutdown>,
    handle: JoinHandle<()>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Replace the configuration file and notify the reload task.
    pub fn rewrite_config(&self, toml: &str) {
        std::fs::write(self.config.path(), toml).unwrap();
        self.notifier.send(()).unwrap();
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.handle.await;
    }
}

pub fn write_config(toml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), toml).unwrap();
    file
}

/// Start a proxy serving `toml` on an ephemeral port.
pub async fn start_proxy(toml: &str) -> TestProxy {
    let config_file = write_config(toml);
    let config = load_config(config_file.path()).unwrap();
    let source = Arc::new(FileEndpointSource::new(config_file.path()));
    let app = Application::build(config, source, Map::new()).unwrap();
    let proxy = app.proxy().clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (notifier, notifications) = mpsc::unbounded_channel();
    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        let _ = app.serve(listener, notifications, &server_shutdown).await;
    });

    TestProxy {
        addr,
        proxy,
        notifier,
        config: config_file,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `check` until it holds or a couple of seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
