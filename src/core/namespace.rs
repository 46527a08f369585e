//! Namespace creation

use crate::core::pat::PatResolver;
use crate::core::registry::{RegistryClient, RegistryResponse};
use crate::core::service::{ServiceError, ServiceResult};
use tracing::info;

/// Create `name` on the registry
///
/// Without an explicit token the resolver is asked for one; a freshly
/// prompted token is not verified since the namespace does not exist yet.
pub async fn create_namespace(
    client: &RegistryClient,
    resolver: &PatResolver,
    name: &str,
    pat: Option<&str>,
) -> ServiceResult<RegistryResponse> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation(
            "Namespace name must not be empty".to_string(),
        ));
    }

    let token = resolver.resolve(name, pat, false).await?;
    let response = client.create_namespace(name, &token).await?;
    info!("Created namespace {}", name);
    Ok(response)
}
