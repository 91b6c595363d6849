//! Service Secret Bundle
//!
//! Each service needs the same fixed set of configuration secrets at
//! startup. Every key is resolved independently through the fallback chain;
//! a key that cannot be resolved gets its hardcoded default so startup can
//! always proceed. The bundle only counts as complete when no key fell back
//! to a default.

use tracing::{error, info, warn};

use crate::vault::client::VaultClient;

/// The named secrets a service requires, populated at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretBundle {
    pub api_key: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub encryption_key: String,
    pub log_level: String,
    pub max_connections: String,

    /// False when any slot holds its default instead of a resolved value.
    pub complete: bool,
}

/// The six bundle keys and their fallback defaults.
const KEYS: [(&str, &str); 6] = [
    ("api_key", "default-api-key"),
    ("database_url", "default-database-url"),
    ("jwt_secret", "default-jwt-secret"),
    ("encryption_key", "default-encryption-key"),
    ("log_level", "INFO"),
    ("max_connections", "100"),
];

impl SecretBundle {
    /// A bundle holding only the hardcoded defaults.
    pub fn defaults() -> Self {
        Self {
            api_key: KEYS[0].1.to_string(),
            database_url: KEYS[1].1.to_string(),
            jwt_secret: KEYS[2].1.to_string(),
            encryption_key: KEYS[3].1.to_string(),
            log_level: KEYS[4].1.to_string(),
            max_connections: KEYS[5].1.to_string(),
            complete: false,
        }
    }

    /// Fetches the bundle for `service` from `<service>/config`.
    ///
    /// A failure on one key never aborts the others: the failing slot keeps
    /// its default and the bundle is marked incomplete.
    pub async fn fetch(client: &VaultClient, service: &str) -> Self {
        let path = format!("{service}/config");
        info!(path = %path, "Retrieving secrets from Vault");

        let mut bundle = Self::defaults();
        bundle.complete = true;

        for (key, _) in KEYS {
            match client.resolve(&path, key).await {
                Ok(value) => *bundle.slot_mut(key) = value,
                Err(e) => {
                    error!(key = key, error = %e, "Failed to retrieve secret from Vault");
                    bundle.complete = false;
                }
            }
        }

        if bundle.complete {
            info!("Successfully retrieved all secrets from Vault");
        } else {
            warn!("Some secrets could not be retrieved from Vault, using defaults");
        }
        bundle
    }

    fn slot_mut(&mut self, key: &str) -> &mut String {
        match key {
            "api_key" => &mut self.api_key,
            "database_url" => &mut self.database_url,
            "jwt_secret" => &mut self.jwt_secret,
            "encryption_key" => &mut self.encryption_key,
            "log_level" => &mut self.log_level,
            "max_connections" => &mut self.max_connections,
            _ => unreachable!("unknown bundle key"),
        }
    }

    /// Logs the populated bundle without exposing secret values.
    pub fn log_summary(&self) {
        info!(
            log_level = %self.log_level,
            max_connections = %self.max_connections,
            complete = self.complete,
            "Secret bundle populated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::client::tests::start_mock_vault;

    #[tokio::test]
    async fn test_fetch_populates_defaults_when_vault_unreachable() {
        let client = VaultClient::new(
            "http://127.0.0.1:1".to_string(),
            "role",
            "root".to_string(),
        )
        .with_token_path("/nonexistent/token/path");

        let bundle = SecretBundle::fetch(&client, "custom-client").await;

        // Every slot is populated even though resolution failed outright.
        assert!(!bundle.complete);
        assert_eq!(bundle, SecretBundle::defaults());
        assert_eq!(bundle.api_key, "default-api-key");
        assert_eq!(bundle.log_level, "INFO");
        assert_eq!(bundle.max_connections, "100");
    }

    #[tokio::test]
    async fn test_fetch_mixes_resolved_and_default_slots() {
        // The mock vault only serves api_key; the other five keys fall back.
        let addr = start_mock_vault("session-abc").await;
        let client = VaultClient::new(addr, "role", "root".to_string())
            .with_token_path("/nonexistent/token/path");

        let bundle = SecretBundle::fetch(&client, "custom-client").await;

        assert_eq!(bundle.api_key, "from-static");
        assert_eq!(bundle.database_url, "default-database-url");
        assert!(!bundle.complete);
    }
}
