//! Connection Dispatcher
//!
//! Owns the listen/accept loop and the per-connection lifecycle for one
//! service. Requests are handled strictly sequentially: a connection is
//! served to completion before the next accept. Each connection carries at
//! most one request/response pair and is always closed afterwards.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! accept -> read once -> parse -> route -> build response -> write -> close
//! ```
//!
//! A zero-byte read closes the connection with no response. A parse failure
//! answers 400. Socket-level failures are logged and the loop continues;
//! they never terminate the service.

use bytes::BytesMut;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{error, info, warn};

use crate::http::{self, request::MAX_REQUEST_SIZE, response, ParsedRequest};
use crate::sink::LogSink;

/// Listen backlog for the service socket.
const LISTEN_BACKLOG: u32 = 10;

/// Where per-request capture files are written by default.
pub const DEFAULT_CAPTURE_DIR: &str = "/tmp/requests";

/// Errors that can occur while serving.
#[derive(Debug, Error)]
pub enum ServeError {
    /// I/O error (bind/accept/read/write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured bind address is not parsable
    #[error("invalid bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),
}

/// An exact-path route answered with a canned message.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub message: String,
}

impl Route {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Per-service configuration: the only thing that differs between the
/// deployed services.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service name, used in log events and response messages
    pub name: String,
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Canned responses for known paths
    pub routes: Vec<Route>,
    /// Directory for per-request capture files
    pub capture_dir: PathBuf,
}

impl ServiceConfig {
    /// The custom-client preset: port 1337 with its API routes.
    pub fn custom_client() -> Self {
        Self {
            name: "custom-client".to_string(),
            host: "0.0.0.0".to_string(),
            port: 1337,
            routes: vec![
                Route::new("/fakeapi", "Custom Client processed fake API request"),
                Route::new("/example", "Custom Client processed example request"),
            ],
            capture_dir: PathBuf::from(DEFAULT_CAPTURE_DIR),
        }
    }

    /// The service-sink preset: port 8080, default echo responses only.
    pub fn service_sink() -> Self {
        Self {
            name: "service-sink".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            routes: Vec::new(),
            capture_dir: PathBuf::from(DEFAULT_CAPTURE_DIR),
        }
    }

    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The accept-loop component for one service.
#[derive(Debug)]
pub struct Dispatcher {
    config: ServiceConfig,
    sink: LogSink,
}

impl Dispatcher {
    pub fn new(config: ServiceConfig, sink: LogSink) -> Self {
        Self { config, sink }
    }

    /// Binds the service socket with address reuse and a small backlog.
    pub fn bind(&self) -> Result<TcpListener, ServeError> {
        let addr: SocketAddr = self.config.bind_address().parse()?;
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        Ok(socket.listen(LISTEN_BACKLOG)?)
    }

    /// Binds and runs the accept loop until the task is cancelled.
    pub async fn run(&self) -> Result<(), ServeError> {
        let listener = self.bind()?;
        info!(
            service = %self.config.name,
            addr = %self.config.bind_address(),
            "Listening for connections"
        );
        self.serve(listener).await
    }

    /// Runs the accept loop on an already-bound listener.
    ///
    /// Strictly sequential: each connection is handled to completion before
    /// the next accept. Accept failures are logged and the loop continues.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServeError> {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = self.handle_connection(stream, addr).await {
                        warn!(client = %addr, error = %e, "Connection ended with error");
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Serves one connection: read once, parse once, respond once, close.
    async fn handle_connection(
        &self,
        mut stream: TcpStream,
        addr: SocketAddr,
    ) -> Result<(), ServeError> {
        let mut buffer = BytesMut::with_capacity(MAX_REQUEST_SIZE);
        let n = stream.read_buf(&mut buffer).await?;

        // Client closed without sending anything: no response owed.
        if n == 0 {
            return Ok(());
        }

        let response = match http::parse(&buffer[..n]) {
            Ok(request) => {
                self.log_request(&request, addr).await;
                let (status, message) = self.dispatch(&request);
                response::build(status, &message)
            }
            Err(e) => {
                warn!(client = %addr, error = %e, "Failed to parse request");
                self.sink
                    .send("ERROR", &format!("Failed to parse request from {addr}"))
                    .await;
                response::build(400, &format!("Bad Request - {}", self.config.name))
            }
        };

        stream.write_all(&response).await?;
        stream.flush().await?;
        // Connection closes when the stream drops; no reuse.
        Ok(())
    }

    /// Decides the status and message for a parsed request.
    fn dispatch(&self, request: &ParsedRequest) -> (u16, String) {
        let path = request.clean_path();

        if path == "/health" {
            return (200, format!("{} is healthy", self.config.name));
        }

        for route in &self.config.routes {
            if route.path == path {
                return (200, route.message.clone());
            }
        }

        (
            200,
            format!(
                "{} processed request to path '{}' (length: {})",
                self.config.name,
                request.path,
                request.path.len()
            ),
        )
    }

    /// Logs a request locally and forwards a summary to the collector.
    async fn log_request(&self, request: &ParsedRequest, addr: SocketAddr) {
        if request.clean_path() == "/health" {
            // Probe traffic gets its own terse log line, not request logging.
            let probe = probe_type(&request.headers);
            info!(service = %self.config.name, probe = probe, client = %addr, "Health probe");
            self.sink
                .send("INFO", &format!("Health check: {probe} probe from {addr}"))
                .await;
            return;
        }

        let query = request.query();
        info!(
            service = %self.config.name,
            client = %addr,
            method = %request.method,
            path = %request.path,
            query = query,
            body_bytes = request.body_length,
            "Request received"
        );

        // Best effort, like the collector: a failed capture never affects
        // the response.
        if let Err(e) =
            write_capture(&self.config.capture_dir, &self.config.name, request, addr).await
        {
            warn!(error = %e, "Failed to write request capture file");
        }

        self.sink
            .send(
                "INFO",
                &format!(
                    "Request: {} {} from {} (Query: {}, Body: {} bytes)",
                    request.method,
                    request.path,
                    addr,
                    if query.is_empty() { "none" } else { query },
                    request.body_length
                ),
            )
            .await;
    }
}

/// Writes one request to a capture file under `dir`.
///
/// The directory is created on demand so the writer works even when startup
/// never ran (and mirrors the service's own pre-creation of the directory).
async fn write_capture(
    dir: &Path,
    service: &str,
    request: &ParsedRequest,
    addr: SocketAddr,
) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    let timestamp = response::unix_timestamp();
    let path = dir.join(format!("{}-request_{}_{}.txt", service, timestamp, addr.ip()));

    let query = request.query();
    let body = if request.body_length > 0 {
        String::from_utf8_lossy(&request.body).into_owned()
    } else {
        "(empty)".to_string()
    };

    let contents = format!(
        "=== {service} HTTP Request Log ===\n\
         Timestamp: {timestamp}\n\
         Client IP: {ip}\n\
         Method: {method}\n\
         Path: {path}\n\
         Version: {version}\n\
         Headers:\n{headers}\n\
         Query Parameters: {query}\n\
         Body Length: {body_length}\n\
         Body Content:\n{body}\n\
         === End Request ===\n",
        ip = addr.ip(),
        method = request.method,
        path = request.path,
        version = request.version,
        headers = request.headers,
        query = if query.is_empty() { "(none)" } else { query },
        body_length = request.body_length,
    );

    tokio::fs::write(&path, contents).await?;
    info!(file = %path.display(), "Request logged to capture file");
    Ok(())
}

/// Identifies the probe kind from the raw header block.
fn probe_type(headers: &str) -> &'static str {
    if headers.contains("X-Probe-Type: liveness") {
        "liveness"
    } else if headers.contains("X-Probe-Type: readiness") {
        "readiness"
    } else {
        "unknown"
    }
}
