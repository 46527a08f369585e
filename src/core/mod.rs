//! Core client modules

pub mod collaborators;
pub mod get;
pub mod namespace;
pub mod pat;
pub mod publish;
pub mod registry;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use collaborators::{ConfirmPrompt, LicenseGate, Manifest, ManifestReader, PackageOptions, Packager, TokenPrompt};
pub use pat::PatResolver;
pub use publish::{BatchReport, JobOutcome, PublishJob, PublishOptions, PublishStatus, Publisher};
pub use registry::{Extension, RegistryClient, RegistryConfig, RegistryError, RegistryResponse};
pub use service::{ServiceError, ServiceResult};
pub use store::{CredentialEntry, CredentialStore, FileStore, StoreError, VaultStore};
