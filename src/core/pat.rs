//! Personal access token resolution per namespace
//!
//! A token is either known (passed explicitly), found in the credential
//! store, or requested interactively. Interactive tokens are verified against
//! the registry unless the caller opts out, and persisted before use.

use crate::core::collaborators::TokenPrompt;
use crate::core::registry::RegistryClient;
use crate::core::service::{ServiceError, ServiceResult};
use crate::core::store::CredentialStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct PatResolver {
    client: Arc<RegistryClient>,
    store: Arc<dyn CredentialStore>,
    prompt: Arc<dyn TokenPrompt>,
    /// Serializes interactive prompts so concurrent jobs do not interleave
    prompt_lock: Mutex<()>,
}

impl PatResolver {
    pub fn new(
        client: Arc<RegistryClient>,
        store: Arc<dyn CredentialStore>,
        prompt: Arc<dyn TokenPrompt>,
    ) -> Self {
        Self {
            client,
            store,
            prompt,
            prompt_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Token for `namespace`: explicit, stored, or prompted for
    ///
    /// Explicit and stored tokens are never re-verified. `verify` only
    /// applies to a freshly prompted token.
    pub async fn resolve(
        &self,
        namespace: &str,
        explicit: Option<&str>,
        verify: bool,
    ) -> ServiceResult<String> {
        if let Some(token) = explicit.filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }

        if let Some(token) = self.store.get(namespace).await {
            debug!("Using stored token for namespace '{}'", namespace);
            return Ok(token);
        }

        let _guard = self.prompt_lock.lock().await;
        // Another job may have stored a token while this one waited
        if let Some(token) = self.store.get(namespace).await {
            return Ok(token);
        }
        self.request(namespace, verify).await
    }

    /// Prompt for a token, optionally verify it, and store it
    pub async fn request(&self, namespace: &str, verify: bool) -> ServiceResult<String> {
        let token = self.prompt.request_token(namespace).await?;
        if verify {
            self.verify_pat(namespace, &token).await?;
        }
        self.store.add(namespace, &token).await?;
        info!("Stored token for namespace '{}' in {}", namespace, self.store.location());
        Ok(token)
    }

    /// Live check that `token` may publish to `namespace`
    pub async fn verify_pat(&self, namespace: &str, token: &str) -> ServiceResult<()> {
        self.client
            .verify_pat(namespace, token)
            .await
            .map_err(|e| {
                ServiceError::Validation(format!(
                    "PAT invalid to publish at {}: {}",
                    namespace, e
                ))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::registry::RegistryConfig;
    use crate::core::store::{MemoryVault, VaultStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedPrompt {
        token: String,
        calls: AtomicUsize,
    }

    impl FixedPrompt {
        fn new(token: &str) -> Arc<Self> {
            Arc::new(Self {
                token: token.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl TokenPrompt for FixedPrompt {
        async fn request_token(&self, _namespace: &str) -> ServiceResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.token.clone())
        }
    }

    async fn resolver(url: &str, prompt: Arc<FixedPrompt>) -> PatResolver {
        let client = Arc::new(RegistryClient::new(RegistryConfig::new(Some(url))).unwrap());
        let store = VaultStore::open(Arc::new(MemoryVault::new())).await.unwrap();
        PatResolver::new(client, Arc::new(store), prompt)
    }

    #[tokio::test]
    async fn test_explicit_token_used_as_is() {
        let server = MockServer::start().await;
        let prompt = FixedPrompt::new("prompted");
        let resolver = resolver(&server.uri(), prompt.clone()).await;

        let token = resolver.resolve("acme", Some("explicit"), true).await.unwrap();
        assert_eq!(token, "explicit");
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stored_token_not_reverified() {
        let server = MockServer::start().await;
        let prompt = FixedPrompt::new("prompted");
        let resolver = resolver(&server.uri(), prompt.clone()).await;
        resolver.store().add("acme", "stored").await.unwrap();

        let token = resolver.resolve("acme", None, true).await.unwrap();
        assert_eq!(token, "stored");
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prompted_token_verified_and_stored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/acme/verify-pat"))
            .and(query_param("token", "prompted"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":"Valid"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let prompt = FixedPrompt::new("prompted");
        let resolver = resolver(&server.uri(), prompt.clone()).await;

        let token = resolver.resolve("acme", None, true).await.unwrap();
        assert_eq!(token, "prompted");
        assert_eq!(resolver.store().get("acme").await.as_deref(), Some("prompted"));

        // Second resolution comes from the store
        resolver.resolve("acme", None, true).await.unwrap();
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_verification_is_fatal_and_not_stored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/acme/verify-pat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"error":"Insufficient access rights for namespace: acme"}"#),
            )
            .mount(&server)
            .await;

        let prompt = FixedPrompt::new("bad");
        let resolver = resolver(&server.uri(), prompt.clone()).await;

        let err = resolver.resolve("acme", None, true).await.unwrap_err();
        assert!(err.to_string().contains("PAT invalid to publish at acme"));
        assert!(err.to_string().contains("Insufficient access rights"));
        assert!(resolver.store().get("acme").await.is_none());
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unverified_token_trusted_and_stored() {
        let server = MockServer::start().await;
        let prompt = FixedPrompt::new("fresh");
        let resolver = resolver(&server.uri(), prompt).await;

        let token = resolver.resolve("new-ns", None, false).await.unwrap();
        assert_eq!(token, "fresh");
        assert_eq!(resolver.store().get("new-ns").await.as_deref(), Some("fresh"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
