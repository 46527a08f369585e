//! Get command implementation

use crate::cli::config::RegistryArgs;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::messages;
use clap::Args;
use std::path::PathBuf;
use vsxpub::core::get::{download_extension, resolve_extension, ExtensionId};

/// Download an extension or print its metadata
#[derive(Debug, Args)]
pub struct GetArgs {
    /// Extension identifier of the form `namespace.extension`
    pub extension_id: String,

    /// Target platform
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Semantic version range, e.g. `^1.2`
    #[arg(long)]
    pub version_range: Option<String>,

    /// File or directory to save the artifact to
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Print the extension metadata instead of downloading
    #[arg(long)]
    pub metadata: bool,
}

pub async fn execute_get(args: GetArgs, registry: &RegistryArgs) -> CliResult<()> {
    let id: ExtensionId = args.extension_id.parse()?;
    let client = registry.client()?;

    let extension = resolve_extension(
        &client,
        &id,
        args.target.as_deref(),
        args.version_range.as_deref(),
    )
    .await?;

    if args.metadata {
        let json = serde_json::to_string_pretty(&extension)
            .map_err(|e| CliError::Validation(format!("Failed to render metadata: {}", e)))?;
        match &args.output {
            Some(path) => {
                tokio::fs::write(path, json).await?;
                println!(
                    "{}",
                    messages::ok(&format!("Saved metadata of {} to {}", id, path.display()))
                );
            }
            None => println!("{}", json),
        }
        return Ok(());
    }

    println!("{}", messages::info(&format!("Downloading {}", extension.describe())));
    let path = download_extension(&client, &extension, args.output.as_deref()).await?;
    println!(
        "{}",
        messages::ok(&format!("Downloaded {} to {}", extension.describe(), path.display()))
    );
    Ok(())
}
