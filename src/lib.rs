//! # edgeserve - Small Parameterized Edge Services
//!
//! edgeserve is one core implementation behind a family of small standalone
//! network services. Each service accepts raw byte-stream HTTP requests over
//! TCP, parses them by hand, answers with a minimal JSON response, resolves
//! its configuration secrets from a Vault-compatible store at startup, and
//! forwards diagnostic events to a remote log collector.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           edgeserve                              │
//! │                                                                  │
//! │  ┌────────────┐    ┌────────────┐    ┌────────────┐              │
//! │  │ Dispatcher │───>│  Request   │───>│  Response  │              │
//! │  │ (accept)   │    │  Parser    │    │  Builder   │              │
//! │  └─────┬──────┘    └────────────┘    └────────────┘              │
//! │        │                                                         │
//! │        └──────────> LogSink ──────> remote log collector         │
//! │                                                                  │
//! │  startup ────> SecretBundle ──> VaultClient (tiered fallback)    │
//! │                                                                  │
//! │  FileCreator (background task) ──> file storage API              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Highlights
//!
//! ### One request per connection
//!
//! The dispatcher reads once, parses once and writes one complete response
//! before closing the connection. There is no keep-alive, no pipelining and
//! no chunked encoding; request handling is strictly sequential.
//!
//! ### Tiered secret resolution
//!
//! Secrets are resolved through an ordered fallback chain: Kubernetes
//! service-account login first, a static token second, hardcoded defaults
//! last. Failures escalate quietly; startup always proceeds.
//!
//! ### Fire-and-forget diagnostics
//!
//! Log forwarding and the background file-creation task are best-effort
//! outbound calls with short timeouts. They share no state with the
//! per-connection path and can never take the service down.
//!
//! ## Module Overview
//!
//! - [`http`]: raw request parser and response builder
//! - [`server`]: connection dispatcher and per-service configuration
//! - [`vault`]: secret store client and the startup secret bundle
//! - [`sink`]: log collector forwarder
//! - [`files`]: background file-creation task

pub mod files;
pub mod http;
pub mod server;
pub mod sink;
pub mod vault;

// Re-export commonly used types for convenience
pub use http::{parse, ParseError, ParsedRequest};
pub use server::{Dispatcher, Route, ServeError, ServiceConfig};
pub use sink::LogSink;
pub use vault::{SecretBundle, VaultClient, VaultError};

/// Version of edgeserve
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
