//! Main CLI application structure

use clap::Parser;

use crate::cli::commands::{auth, get, namespace, publish, Commands};
use crate::cli::config::RegistryArgs;
use crate::cli::error::CliResult;

/// vsxpub - Publish extensions to Open VSX registries
#[derive(Debug, Parser)]
#[command(name = "vsxpub")]
#[command(version = vsxpub::VERSION)]
#[command(about = "vsxpub - Publish extensions to Open VSX registries")]
#[command(long_about = "vsxpub packages and publishes VS Code extensions and manages \
                         the personal access tokens used per namespace.\n\n\
                         Tokens are kept in the system credential manager when available, \
                         otherwise in ~/.vsxpub (relocate with VSXPUB_CONFIG_DIR).\n\n\
                         Examples:\n\
                           vsxpub publish                        # Package and publish ./\n\
                           vsxpub publish dist/my-ext-1.0.0.vsix # Publish a pre-built file\n\
                           vsxpub publish -p a -p b -t linux-x64 -t win32-x64\n\
                           vsxpub get redhat.java --version-range ^1.20\n\
                           vsxpub login my-namespace")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> CliResult<()> {
        vsxpub::init_logging(self.verbose);

        let registry = &self.registry;
        match self.command {
            Commands::Publish(args) => publish::execute_publish(args, registry).await,
            Commands::Get(args) => get::execute_get(args, registry).await,
            Commands::CreateNamespace(args) => {
                namespace::execute_create_namespace(args, registry).await
            }
            Commands::VerifyPat(args) => auth::execute_verify_pat(args, registry).await,
            Commands::Login(args) => auth::execute_login(args, registry).await,
            Commands::Logout(args) => auth::execute_logout(args).await,
        }
    }
}
