//! Wire types of the registry API

use crate::core::registry::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extension description returned by publish and metadata queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// File URLs keyed by kind (`download`, `manifest`, `readme`, ...)
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Metadata URLs keyed by version; also holds aliases such as `latest`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub all_versions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloadable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_release: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
}

impl Extension {
    /// `namespace.name v1.2.3[@target]`
    pub fn describe(&self) -> String {
        let mut description = format!("{}.{} v{}", self.namespace, self.name, self.version);
        if let Some(target) = self.target_platform.as_deref().filter(|t| *t != "universal") {
            description.push('@');
            description.push_str(target);
        }
        description
    }

    pub fn download_url(&self) -> Option<&str> {
        self.files.get("download").map(String::as_str)
    }
}

/// Generic result body for namespace creation and PAT verification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Structured error body sent with failing status codes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub trace: Option<String>,
}

/// Responses that can report a logical failure inside a successful body
pub trait CheckedResponse: Sized {
    fn logical_error(&self) -> Option<&str>;

    /// Turn a non-empty `error` field into [`RegistryError::Logical`]
    fn check(self) -> Result<Self, RegistryError> {
        match self.logical_error().filter(|e| !e.is_empty()) {
            Some(error) => Err(RegistryError::Logical(error.to_string())),
            None => Ok(self),
        }
    }
}

impl CheckedResponse for Extension {
    fn logical_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl CheckedResponse for RegistryResponse {
    fn logical_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
