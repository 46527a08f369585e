//! Registry connection settings

use serde::{Deserialize, Serialize};

/// Public registry used when nothing else is configured
pub const DEFAULT_REGISTRY_URL: &str = "https://open-vsx.org";

/// Connection settings for a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL without trailing slash
    pub url: String,

    /// HTTP basic auth for registries behind an authenticating proxy
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    /// Ask for license acceptance before packaging
    #[serde(default)]
    pub requires_license: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("vsxpub/{}", crate::VERSION)
}

impl RegistryConfig {
    pub fn new(url: Option<&str>) -> Self {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_REGISTRY_URL);
        Self {
            url: normalize_registry_url(url),
            username: None,
            password: None,
            requires_license: false,
            user_agent: default_user_agent(),
        }
    }

    pub fn with_basic_auth(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    pub fn with_requires_license(mut self, requires_license: bool) -> Self {
        self.requires_license = requires_license;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Strip trailing slashes so endpoint paths can be appended
fn normalize_registry_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
