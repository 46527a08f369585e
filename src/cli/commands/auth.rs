//! Token management commands: login, logout and verify-pat

use crate::cli::config::{create_resolver, resolve_pat, RegistryArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::{manifest_publisher, messages};
use clap::Args;
use std::path::Path;
use vsxpub::core::store::open_default_store;

/// Store a token for a namespace
#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Namespace the token publishes to
    pub namespace: String,
}

/// Remove the stored token of a namespace
#[derive(Debug, Args)]
pub struct LogoutArgs {
    /// Namespace to forget
    pub namespace: String,
}

/// Check that a token may publish to a namespace
#[derive(Debug, Args)]
pub struct VerifyPatArgs {
    /// Namespace to check (default: `publisher` of ./package.json)
    pub namespace: Option<String>,

    /// Personal access token (env: VSXPUB_PAT)
    #[arg(long)]
    pub pat: Option<String>,
}

/// Prompt, verify and store a token; an existing token is replaced
pub async fn execute_login(args: LoginArgs, registry: &RegistryArgs) -> CliResult<()> {
    let client = registry.client()?;
    let resolver = create_resolver(client).await?;

    if resolver.store().get(&args.namespace).await.is_some() {
        println!(
            "{}",
            messages::info(&format!(
                "Namespace {} already has a stored token; it will be replaced",
                args.namespace
            ))
        );
    }

    resolver.request(&args.namespace, true).await?;
    println!(
        "{}",
        messages::ok(&format!(
            "PAT valid to publish at {}; stored in {}",
            args.namespace,
            resolver.store().location()
        ))
    );
    Ok(())
}

pub async fn execute_logout(args: LogoutArgs) -> CliResult<()> {
    let store = open_default_store().await?;
    if store.get(&args.namespace).await.is_none() {
        return Err(CliError::Validation(format!(
            "{} is not a known namespace",
            args.namespace
        )));
    }

    store.delete(&args.namespace).await?;
    println!(
        "{}",
        messages::ok(&format!("Removed the token of namespace {}", args.namespace))
    );
    Ok(())
}

pub async fn execute_verify_pat(args: VerifyPatArgs, registry: &RegistryArgs) -> CliResult<()> {
    let namespace = match args.namespace {
        Some(namespace) => namespace,
        None => manifest_publisher(Path::new("."))?,
    };

    let client = registry.client()?;
    let resolver = create_resolver(client).await?;
    let known = match resolve_pat(args.pat) {
        Some(token) => Some(token),
        None => resolver.store().get(&namespace).await,
    };

    match known {
        Some(token) => resolver.verify_pat(&namespace, &token).await?,
        // A prompted token is verified before it is stored
        None => {
            resolver.request(&namespace, true).await?;
        }
    }

    println!(
        "{}",
        messages::ok(&format!("PAT valid to publish at {}", namespace))
    );
    Ok(())
}
