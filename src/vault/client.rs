//! Vault Client and Authentication Fallback Chain
//!
//! Secrets are read from a Vault-compatible store using an ordered fallback
//! chain, first success wins:
//!
//! 1. **Privileged tier**: exchange the locally mounted Kubernetes service
//!    account token for a Vault session token, then read with it. A fresh
//!    login is performed on every attempt; sessions are not cached.
//! 2. **Static tier**: read with a fixed token from the environment
//!    (`VAULT_TOKEN`, default `root`).
//!
//! A missing service account token is the normal case outside Kubernetes,
//! so privileged-tier failures escalate quietly. Only when both network
//! tiers fail does the caller see an error, and callers are expected to
//! substitute defaults rather than abort (see [`crate::vault::secrets`]).

use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Default Vault address when `VAULT_ADDR` is unset.
pub const DEFAULT_VAULT_ADDR: &str = "http://vault.edge-terrarium.svc.cluster.local:8200";

/// Default static token when `VAULT_TOKEN` is unset.
pub const DEFAULT_VAULT_TOKEN: &str = "root";

/// Where Kubernetes mounts the service account token.
pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Timeout for every Vault call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from secret resolution.
///
/// Individual tier failures are internal; only chain exhaustion escapes
/// [`VaultClient::resolve`].
#[derive(Debug, Error)]
pub enum VaultError {
    /// No service account token is mounted (expected off-cluster)
    #[error("service account token not available")]
    NoServiceAccountToken,

    /// Network-level failure talking to Vault
    #[error("vault request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response did not have the expected JSON shape
    #[error("malformed vault response: {0}")]
    MalformedResponse(&'static str),

    /// Every tier of the fallback chain failed for this key
    #[error("secret '{key}' could not be resolved from '{path}'")]
    Exhausted { path: String, key: String },
}

/// A client for one Vault endpoint, shared by all lookups of a service.
#[derive(Debug, Clone)]
pub struct VaultClient {
    client: reqwest::Client,
    addr: String,
    role: String,
    static_token: String,
    token_path: PathBuf,
}

impl VaultClient {
    /// Creates a client from `VAULT_ADDR` / `VAULT_TOKEN`, authenticating
    /// the privileged tier as `role`.
    pub fn from_env(role: impl Into<String>) -> Self {
        let addr = std::env::var("VAULT_ADDR").unwrap_or_else(|_| DEFAULT_VAULT_ADDR.to_string());
        let static_token =
            std::env::var("VAULT_TOKEN").unwrap_or_else(|_| DEFAULT_VAULT_TOKEN.to_string());
        Self::new(addr, role, static_token)
    }

    /// Creates a client with explicit configuration.
    pub fn new(addr: String, role: impl Into<String>, static_token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            addr,
            role: role.into(),
            static_token,
            token_path: PathBuf::from(SERVICE_ACCOUNT_TOKEN_PATH),
        }
    }

    /// Overrides where the service account token is read from.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Resolves one secret through the fallback chain.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Exhausted`] when both the privileged and the
    /// static tier fail.
    pub async fn resolve(&self, path: &str, key: &str) -> Result<String, VaultError> {
        match self.resolve_privileged(path, key).await {
            Ok(value) => {
                info!(key = key, "Resolved secret via privileged authentication");
                return Ok(value);
            }
            Err(e) => {
                // Expected when no service account token is mounted.
                debug!(key = key, error = %e, "Privileged tier unavailable, trying static token");
            }
        }

        match self.read_secret(&self.static_token, path, key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!(key = key, error = %e, "Static tier failed");
                Err(VaultError::Exhausted {
                    path: path.to_string(),
                    key: key.to_string(),
                })
            }
        }
    }

    /// Privileged tier: login, then read with the session token.
    async fn resolve_privileged(&self, path: &str, key: &str) -> Result<String, VaultError> {
        let session_token = self.authenticate().await?;
        self.read_secret(&session_token, path, key).await
    }

    /// Exchanges the service account token for a Vault session token.
    ///
    /// No caching: every call performs a fresh login.
    pub async fn authenticate(&self) -> Result<String, VaultError> {
        let jwt = tokio::fs::read_to_string(&self.token_path)
            .await
            .map_err(|_| VaultError::NoServiceAccountToken)?;
        let jwt = jwt.trim();
        if jwt.is_empty() {
            return Err(VaultError::NoServiceAccountToken);
        }

        let url = format!("{}/v1/auth/kubernetes/login", self.addr);
        let response: Value = self
            .client
            .post(&url)
            .json(&json!({ "role": &self.role, "jwt": jwt }))
            .send()
            .await?
            .json()
            .await?;

        response["auth"]["client_token"]
            .as_str()
            .map(str::to_string)
            .ok_or(VaultError::MalformedResponse(
                "missing auth.client_token in login response",
            ))
    }

    /// Reads `key` from the secret at `path` using `token`.
    ///
    /// Expects the KV-v2 response shape `{"data":{"data":{<key>:<value>}}}`;
    /// a missing nesting level, a missing key or a non-string value is a
    /// read failure.
    pub async fn read_secret(
        &self,
        token: &str,
        path: &str,
        key: &str,
    ) -> Result<String, VaultError> {
        let url = format!("{}/v1/secret/data/{}", self.addr, path);
        let response: Value = self
            .client
            .get(&url)
            .header("X-Vault-Token", token)
            .send()
            .await?
            .json()
            .await?;

        response["data"]["data"][key]
            .as_str()
            .map(str::to_string)
            .ok_or(VaultError::MalformedResponse(
                "missing data.data.<key> in secret response",
            ))
    }
}
