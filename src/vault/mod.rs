//! Secret resolution against a Vault-compatible store: the authenticated
//! client with its tiered fallback chain, and the startup secret bundle.

pub mod client;
pub mod secrets;

pub use client::{VaultClient, VaultError, DEFAULT_VAULT_ADDR, DEFAULT_VAULT_TOKEN};
pub use secrets::SecretBundle;
