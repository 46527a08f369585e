//! Registry module for the Open VSX publish protocol

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod response;

pub use client::RegistryClient;
pub use config::{RegistryConfig, DEFAULT_REGISTRY_URL};
pub use error::RegistryError;
pub use models::{CheckedResponse, ErrorResponse, Extension, RegistryResponse};
pub use response::{decode_as, decode_response};
