//! # vsxpub
//!
//! Publish client for Open VSX style extension registries.
//!
//! ## Architecture
//!
//! The crate is organised in four layers:
//! - Credential storage: a namespace to token mapping kept either in the OS
//!   credential manager or in a clear-text file, with one-way migration
//! - Registry client: the HTTP JSON/binary protocol, including streaming
//!   uploads and downloads
//! - PAT resolution: known token, store lookup, or interactive prompt
//! - Batch publishing: many independent publish jobs run concurrently and
//!   reported together
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vsxpub::core::collaborators::{CommandPackager, InquirePrompt, LicenseFileGate, VsixManifestReader};
//! use vsxpub::core::publish::{PublishOptions, Publisher};
//! use vsxpub::core::registry::{RegistryClient, RegistryConfig};
//! use vsxpub::core::pat::PatResolver;
//! use vsxpub::core::store::open_default_store;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(RegistryClient::new(RegistryConfig::default())?);
//!     let store = open_default_store().await?;
//!     let resolver = Arc::new(PatResolver::new(client.clone(), store, Arc::new(InquirePrompt)));
//!
//!     let publisher = Arc::new(Publisher::new(
//!         client,
//!         resolver,
//!         Arc::new(CommandPackager::from_env()),
//!         Arc::new(VsixManifestReader),
//!         Arc::new(LicenseFileGate::new(Arc::new(InquirePrompt))),
//!     ));
//!
//!     let report = publisher
//!         .publish_all(PublishOptions {
//!             extension_file: Some("my-extension-1.0.0.vsix".into()),
//!             ..Default::default()
//!         })
//!         .await;
//!
//!     println!("{} published, {} failed", report.successes().count(), report.failures().count());
//!     Ok(())
//! }
//! ```

pub mod core;

pub use core::registry::{Extension, RegistryClient, RegistryConfig, RegistryError};
pub use core::service::{ServiceError, ServiceResult};
pub use core::store::{open_default_store, CredentialEntry, CredentialStore, StoreError};

/// Version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging for the client (safe for testing)
///
/// `RUST_LOG` takes precedence over the built-in default filter.
pub fn init_logging(verbose: bool) {
    // Only initialize logging once
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;

        let default_filter = if verbose { "vsxpub=debug" } else { "vsxpub=info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        // This will fail silently if already initialized
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
