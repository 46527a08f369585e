//! Registry settings and shared wiring for CLI commands
//!
//! Precedence is command line flag, then environment variable, then default.

use crate::cli::error::{CliError, CliResult};
use clap::Args;
use std::env;
use std::sync::Arc;
use tracing::debug;
use vsxpub::core::collaborators::InquirePrompt;
use vsxpub::core::pat::PatResolver;
use vsxpub::core::store::open_default_store;
use vsxpub::{RegistryClient, RegistryConfig};

pub const REGISTRY_URL_ENV: &str = "VSXPUB_REGISTRY_URL";
pub const PAT_ENV: &str = "VSXPUB_PAT";
pub const USERNAME_ENV: &str = "VSXPUB_USERNAME";
pub const PASSWORD_ENV: &str = "VSXPUB_PASSWORD";
pub const REQUIRE_LICENSE_ENV: &str = "VSXPUB_REQUIRE_LICENSE";

/// Registry connection flags shared by every command
#[derive(Debug, Clone, Default, Args)]
pub struct RegistryArgs {
    /// Registry base URL (default: https://open-vsx.org, env: VSXPUB_REGISTRY_URL)
    #[arg(short = 'r', long, global = true)]
    pub registry_url: Option<String>,

    /// User name for HTTP basic auth (env: VSXPUB_USERNAME)
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Password for HTTP basic auth (env: VSXPUB_PASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Ask for license acceptance before packaging (env: VSXPUB_REQUIRE_LICENSE)
    #[arg(long, global = true)]
    pub require_license: bool,
}

impl RegistryArgs {
    pub fn registry_config(&self) -> RegistryConfig {
        let url = self.registry_url.clone().or_else(|| env_value(REGISTRY_URL_ENV));
        let username = self.username.clone().or_else(|| env_value(USERNAME_ENV));
        let password = self.password.clone().or_else(|| env_value(PASSWORD_ENV));
        let requires_license = self.require_license || env_flag(REQUIRE_LICENSE_ENV);

        RegistryConfig::new(url.as_deref())
            .with_basic_auth(username, password)
            .with_requires_license(requires_license)
    }

    pub fn client(&self) -> CliResult<Arc<RegistryClient>> {
        let config = self.registry_config();
        debug!("Using registry {}", config.url);
        let client = RegistryClient::new(config)
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(Arc::new(client))
    }
}

/// Resolver over the default credential store with a terminal prompt
pub async fn create_resolver(client: Arc<RegistryClient>) -> CliResult<Arc<PatResolver>> {
    let store = open_default_store().await?;
    Ok(Arc::new(PatResolver::new(
        client,
        store,
        Arc::new(InquirePrompt),
    )))
}

/// Explicit token from the flag or `VSXPUB_PAT`
pub fn resolve_pat(flag: Option<String>) -> Option<String> {
    flag.filter(|p| !p.is_empty()).or_else(|| env_value(PAT_ENV))
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// `true` or `1`
fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_flags_build_registry_config() {
        let args = RegistryArgs {
            registry_url: Some("https://registry.example.com/".to_string()),
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
            require_license: true,
        };
        let config = args.registry_config();
        assert_eq!(config.url, "https://registry.example.com");
        assert_eq!(config.username.as_deref(), Some("user"));
        assert!(config.requires_license);
    }

    #[test]
    fn test_explicit_pat_wins() {
        assert_eq!(resolve_pat(Some("flag".to_string())).as_deref(), Some("flag"));
    }
}
