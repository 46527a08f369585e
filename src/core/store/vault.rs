//! Credential store backed by the OS credential manager

use crate::core::store::{CredentialEntry, CredentialStore, StoreError, StoreResult, VAULT_SERVICE};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Account holding the list of stored namespaces.
///
/// Credential managers cannot enumerate secrets portably, so the namespace
/// list is kept in a secret of its own.
const INDEX_ACCOUNT: &str = "__index__";

/// Secret backend keyed by namespace; calls may block
pub trait SecretVault: Send + Sync {
    fn list(&self) -> StoreResult<Vec<CredentialEntry>>;

    fn set(&self, namespace: &str, token: &str) -> StoreResult<()>;

    fn delete(&self, namespace: &str) -> StoreResult<()>;

    fn describe(&self) -> String;
}

/// [`SecretVault`] over the platform keychain via the `keyring` crate
pub struct KeyringVault {
    service: String,
}

impl KeyringVault {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str) -> StoreResult<keyring::Entry> {
        keyring::Entry::new(&self.service, account).map_err(vault_error)
    }

    fn read_index(&self) -> StoreResult<Vec<String>> {
        match self.entry(INDEX_ACCOUNT)?.get_password() {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Vault(format!("Invalid namespace index: {}", e))),
            Err(keyring::Error::NoEntry) => Ok(Vec::new()),
            Err(e) => Err(vault_error(e)),
        }
    }

    fn write_index(&self, namespaces: &[String]) -> StoreResult<()> {
        let raw = serde_json::to_string(namespaces)
            .map_err(|e| StoreError::Vault(format!("Failed to encode namespace index: {}", e)))?;
        self.entry(INDEX_ACCOUNT)?
            .set_password(&raw)
            .map_err(vault_error)
    }
}

fn vault_error(e: keyring::Error) -> StoreError {
    StoreError::Vault(e.to_string())
}

impl SecretVault for KeyringVault {
    fn list(&self) -> StoreResult<Vec<CredentialEntry>> {
        let mut entries = Vec::new();
        for namespace in self.read_index()? {
            match self.entry(&namespace)?.get_password() {
                Ok(token) => entries.push(CredentialEntry::new(namespace, token)),
                // Index is stale; the secret was removed outside of this tool
                Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(vault_error(e)),
            }
        }
        Ok(entries)
    }

    fn set(&self, namespace: &str, token: &str) -> StoreResult<()> {
        self.entry(namespace)?
            .set_password(token)
            .map_err(vault_error)?;

        let mut index = self.read_index()?;
        if !index.iter().any(|n| n == namespace) {
            index.push(namespace.to_string());
            self.write_index(&index)?;
        }
        Ok(())
    }

    fn delete(&self, namespace: &str) -> StoreResult<()> {
        match self.entry(namespace)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => return Err(vault_error(e)),
        }

        let mut index = self.read_index()?;
        let before = index.len();
        index.retain(|n| n != namespace);
        if index.len() != before {
            self.write_index(&index)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("system credential manager (service '{}')", self.service)
    }
}

/// In-process [`SecretVault`] for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryVault {
    secrets: std::sync::Mutex<BTreeMap<String, String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let secrets = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            secrets: std::sync::Mutex::new(secrets),
        }
    }

    /// Current contents of the vault itself, bypassing any store index
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.secrets
            .lock()
            .map_err(|_| StoreError::Vault("memory vault poisoned".to_string()))
    }
}

impl SecretVault for MemoryVault {
    fn list(&self) -> StoreResult<Vec<CredentialEntry>> {
        Ok(self
            .lock()?
            .iter()
            .map(|(k, v)| CredentialEntry::new(k.clone(), v.clone()))
            .collect())
    }

    fn set(&self, namespace: &str, token: &str) -> StoreResult<()> {
        self.lock()?.insert(namespace.to_string(), token.to_string());
        Ok(())
    }

    fn delete(&self, namespace: &str) -> StoreResult<()> {
        self.lock()?.remove(namespace);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory credential vault".to_string()
    }
}

/// [`CredentialStore`] over a [`SecretVault`]
///
/// Existing secrets are enumerated once at open time into an in-memory
/// index that serves `get` and `size`; mutations go to both.
pub struct VaultStore {
    vault: Arc<dyn SecretVault>,
    index: Mutex<BTreeMap<String, String>>,
}

impl VaultStore {
    /// Open the vault, failing if it cannot be read
    pub async fn open(vault: Arc<dyn SecretVault>) -> StoreResult<Self> {
        let entries = blocking(&vault, |v| v.list()).await?;
        let index = entries
            .into_iter()
            .map(|e| (e.namespace, e.token))
            .collect();
        Ok(Self {
            vault,
            index: Mutex::new(index),
        })
    }

    /// Open the platform credential manager under the default service name
    pub async fn open_keyring() -> StoreResult<Self> {
        Self::open(Arc::new(KeyringVault::new(VAULT_SERVICE))).await
    }
}

/// Run a vault call off the async executor
async fn blocking<T, F>(vault: &Arc<dyn SecretVault>, f: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn SecretVault) -> StoreResult<T> + Send + 'static,
{
    let vault = Arc::clone(vault);
    tokio::task::spawn_blocking(move || f(vault.as_ref()))
        .await
        .map_err(|e| StoreError::Vault(format!("credential manager task failed: {}", e)))?
}

#[async_trait::async_trait]
impl CredentialStore for VaultStore {
    async fn get(&self, namespace: &str) -> Option<String> {
        self.index.lock().await.get(namespace).cloned()
    }

    async fn add(&self, namespace: &str, token: &str) -> StoreResult<()> {
        let mut index = self.index.lock().await;
        let (ns, tok) = (namespace.to_string(), token.to_string());
        blocking(&self.vault, move |v| v.set(&ns, &tok)).await?;
        index.insert(namespace.to_string(), token.to_string());
        Ok(())
    }

    async fn delete(&self, namespace: &str) -> StoreResult<()> {
        let mut index = self.index.lock().await;
        let ns = namespace.to_string();
        blocking(&self.vault, move |v| v.delete(&ns)).await?;
        index.remove(namespace);
        Ok(())
    }

    async fn entries(&self) -> Vec<CredentialEntry> {
        self.index
            .lock()
            .await
            .iter()
            .map(|(k, v)| CredentialEntry::new(k.clone(), v.clone()))
            .collect()
    }

    fn location(&self) -> String {
        self.vault.describe()
    }
}
