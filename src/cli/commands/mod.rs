//! Command modules for CLI

pub mod auth;
pub mod get;
pub mod namespace;
pub mod publish;

use clap::Subcommand;

#[derive(Debug, Subcommand)]
#[command(about = "vsxpub commands")]
pub enum Commands {
    /// Package and publish extensions
    #[command(about = "Package and publish extensions to the registry")]
    Publish(publish::PublishArgs),

    /// Download an extension or print its metadata
    #[command(about = "Download an extension or print its metadata")]
    Get(get::GetArgs),

    /// Create a publisher namespace
    #[command(about = "Create a publisher namespace")]
    CreateNamespace(namespace::CreateNamespaceArgs),

    /// Check a personal access token against a namespace
    #[command(about = "Check that a personal access token may publish to a namespace")]
    VerifyPat(auth::VerifyPatArgs),

    /// Store a personal access token for a namespace
    #[command(about = "Store a personal access token for a namespace")]
    Login(auth::LoginArgs),

    /// Remove the stored token of a namespace
    #[command(about = "Remove the stored personal access token of a namespace")]
    Logout(auth::LogoutArgs),
}
