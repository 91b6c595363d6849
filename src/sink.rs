//! Log Collector Forwarder
//!
//! Forwards diagnostic events to the remote log collector (logthon) as
//! fire-and-forget HTTP posts. Delivery failures are logged locally and
//! never propagated: losing a diagnostic line must not affect request
//! handling or startup.

use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use crate::http::response::unix_timestamp;

/// Default collector hostname when `LOGTHON_HOST` is unset.
pub const DEFAULT_LOGTHON_HOST: &str = "logthon";

/// Default collector port when `LOGTHON_PORT` is unset.
pub const DEFAULT_LOGTHON_PORT: &str = "5000";

/// Short timeouts so an unreachable collector cannot stall the service.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
struct LogEvent<'a> {
    service: &'a str,
    level: &'a str,
    message: &'a str,
    metadata: Metadata,
}

#[derive(Debug, Serialize)]
struct Metadata {
    timestamp: String,
    container_id: String,
    container_name: String,
}

/// A handle to the remote log collector for one service.
#[derive(Debug, Clone)]
pub struct LogSink {
    client: reqwest::Client,
    url: String,
    service: String,
}

impl LogSink {
    /// Creates a sink for `service`, reading the collector endpoint from
    /// `LOGTHON_HOST` / `LOGTHON_PORT` with cluster-local defaults.
    pub fn from_env(service: impl Into<String>) -> Self {
        let host =
            std::env::var("LOGTHON_HOST").unwrap_or_else(|_| DEFAULT_LOGTHON_HOST.to_string());
        let port =
            std::env::var("LOGTHON_PORT").unwrap_or_else(|_| DEFAULT_LOGTHON_PORT.to_string());
        Self::new(service, format!("http://{host}:{port}/api/logs"))
    }

    /// Creates a sink posting to an explicit collector URL.
    pub fn new(service: impl Into<String>, url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            url,
            service: service.into(),
        }
    }

    /// Sends one log event to the collector. Best effort: failures are
    /// reported via tracing and swallowed.
    pub async fn send(&self, level: &str, message: &str) {
        let event = LogEvent {
            service: &self.service,
            level,
            message,
            metadata: Metadata {
                timestamp: unix_timestamp().to_string(),
                container_id: container_id(),
                container_name: container_name(),
            },
        };

        let result = self.client.post(&self.url).json(&event).send().await;
        if let Err(e) = result {
            warn!(url = %self.url, error = %e, "Failed to forward log to collector");
        }
    }
}

/// Container identity from the hostname (the pod name under Kubernetes).
fn container_id() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

/// A friendlier container name when the orchestrator provides one.
fn container_name() -> String {
    std::env::var("CONTAINER_NAME")
        .or_else(|_| std::env::var("POD_NAME"))
        .unwrap_or_else(|_| container_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection, captures the full request and answers 200.
    async fn capture_one(listener: TcpListener) -> String {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if request_complete(&buf) {
                break;
            }
        }
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
            .await
            .unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// True once the headers and the declared body length have arrived.
    fn request_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let declared: usize = head
            .lines()
            .find_map(|line| {
                line.to_ascii_lowercase()
                    .strip_prefix("content-length: ")
                    .map(str::to_string)
            })
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        body.len() >= declared
    }

    #[tokio::test]
    async fn test_send_posts_structured_event() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let capture = tokio::spawn(capture_one(listener));

        let sink = LogSink::new("service-sink", format!("http://{addr}/api/logs"));
        sink.send("INFO", "hello collector").await;

        let request = capture.await.unwrap();
        assert!(request.starts_with("POST /api/logs"));

        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["service"], "service-sink");
        assert_eq!(json["level"], "INFO");
        assert_eq!(json["message"], "hello collector");
        assert!(json["metadata"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_send_swallows_unreachable_collector() {
        // Nothing is listening here; send must return without error.
        let sink = LogSink::new("service-sink", "http://127.0.0.1:1/api/logs".to_string());
        sink.send("ERROR", "nobody home").await;
    }
}
