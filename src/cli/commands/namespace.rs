//! Namespace command implementation

use crate::cli::config::{create_resolver, resolve_pat, RegistryArgs};
use crate::cli::error::CliResult;
use crate::cli::utils::messages;
use clap::Args;
use vsxpub::core::namespace::create_namespace;

/// Create a publisher namespace
#[derive(Debug, Args)]
pub struct CreateNamespaceArgs {
    /// Name of the namespace
    pub name: String,

    /// Personal access token (env: VSXPUB_PAT)
    #[arg(long)]
    pub pat: Option<String>,
}

pub async fn execute_create_namespace(
    args: CreateNamespaceArgs,
    registry: &RegistryArgs,
) -> CliResult<()> {
    let client = registry.client()?;
    let resolver = create_resolver(client.clone()).await?;
    let pat = resolve_pat(args.pat);

    create_namespace(&client, &resolver, &args.name, pat.as_deref()).await?;
    println!("{}", messages::ok(&format!("Created namespace {}", args.name)));
    Ok(())
}
