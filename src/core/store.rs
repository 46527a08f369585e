//! Credential storage for namespace access tokens
//!
//! Two backends implement [`CredentialStore`]: the OS credential manager
//! ([`VaultStore`]) and a clear-text JSON file ([`FileStore`]).
//! [`open_default_store`] prefers the vault and migrates any file entries
//! into it; when the vault is unavailable it falls back to the file.

pub mod file;
pub mod vault;

pub use file::FileStore;
pub use vault::{KeyringVault, MemoryVault, SecretVault, VaultStore};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable selecting the backend (`file` forces the file store)
pub const STORE_ENV: &str = "VSXPUB_STORE";

/// Service name under which vault secrets are stored
pub const VAULT_SERVICE: &str = "vsxpub";

/// A namespace and the token used to publish to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEntry {
    #[serde(rename = "name")]
    pub namespace: String,
    #[serde(rename = "value")]
    pub token: String,
}

impl CredentialEntry {
    pub fn new(namespace: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            token: token.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access credential store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential store {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Credential manager error: {0}")]
    Vault(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable mapping from namespace to token
///
/// Implementations serialize their own writes, so concurrent `add` calls
/// from independent publish jobs are safe.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, namespace: &str) -> Option<String>;

    /// Insert or overwrite the token for `namespace`
    async fn add(&self, namespace: &str, token: &str) -> StoreResult<()>;

    async fn delete(&self, namespace: &str) -> StoreResult<()>;

    async fn entries(&self) -> Vec<CredentialEntry>;

    async fn size(&self) -> usize {
        self.entries().await.len()
    }

    /// Human readable location, used in messages
    fn location(&self) -> String;
}

/// Whether `VSXPUB_STORE` asks for the file backend
fn forces_file_store() -> bool {
    std::env::var(STORE_ENV)
        .map(|v| v.eq_ignore_ascii_case("file"))
        .unwrap_or(false)
}

/// Open the store the CLI should use
///
/// Order: `VSXPUB_STORE=file` → file store; otherwise the OS credential
/// manager, migrating file entries into it; file store if the credential
/// manager cannot be opened.
pub async fn open_default_store() -> StoreResult<Arc<dyn CredentialStore>> {
    let file_store = FileStore::open(FileStore::default_path()?).await?;
    if forces_file_store() {
        return Ok(Arc::new(file_store));
    }

    let vault = VaultStore::open_keyring().await;
    select_store(file_store, vault).await
}

/// Pick between an opened file store and the outcome of opening the vault
pub async fn select_store(
    file_store: FileStore,
    vault: StoreResult<VaultStore>,
) -> StoreResult<Arc<dyn CredentialStore>> {
    let vault = match vault {
        Ok(vault) => vault,
        Err(e) => {
            warn!(
                "Failed to open the system credential manager ({}). Falling back to storing secrets clear-text in: {}",
                e,
                file_store.path().display()
            );
            return Ok(Arc::new(file_store));
        }
    };

    migrate_file_store(&file_store, &vault).await?;
    Ok(Arc::new(vault))
}

/// Move every file entry into the vault and delete the file
///
/// Returns the number of migrated entries; an empty file store is left alone.
pub async fn migrate_file_store(file_store: &FileStore, vault: &VaultStore) -> StoreResult<usize> {
    let entries = file_store.entries().await;
    if entries.is_empty() {
        return Ok(0);
    }

    for entry in &entries {
        vault.add(&entry.namespace, &entry.token).await?;
    }
    file_store.delete_store().await?;

    info!(
        "Migrated {} namespace(s) to the system credential manager. Deleted local store '{}'.",
        entries.len(),
        file_store.path().display()
    );
    Ok(entries.len())
}
