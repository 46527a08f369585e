//! Publish command implementation

use crate::cli::config::{create_resolver, resolve_pat, RegistryArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::messages;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use vsxpub::core::collaborators::{
    CommandPackager, InquirePrompt, LicenseFileGate, PackageOptions, VsixManifestReader,
};
use vsxpub::core::publish::{BatchReport, PublishOptions, PublishStatus, Publisher};

/// Package and publish extensions
#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Pre-built .vsix file to publish, or an extension source directory
    pub extension_file: Option<PathBuf>,

    /// Extension source directory or .vsix file; repeatable
    #[arg(short = 'p', long = "package-path")]
    pub package_paths: Vec<PathBuf>,

    /// Target platform to package for; repeatable
    #[arg(short = 't', long = "target")]
    pub targets: Vec<String>,

    /// Personal access token (env: VSXPUB_PAT)
    #[arg(long)]
    pub pat: Option<String>,

    /// Succeed when the version is already published
    #[arg(long)]
    pub skip_duplicate: bool,

    /// Mark the extension as a pre-release
    #[arg(long)]
    pub pre_release: bool,

    /// Prepend relative links in README.md with this URL
    #[arg(long)]
    pub base_content_url: Option<String>,

    /// Prepend relative image links in README.md with this URL
    #[arg(long)]
    pub base_images_url: Option<String>,

    /// Use yarn instead of npm while packaging
    #[arg(long)]
    pub yarn: bool,

    /// Skip dependency detection while packaging
    #[arg(long)]
    pub no_dependencies: bool,

    /// Version to package as
    #[arg(long)]
    pub package_version: Option<String>,
}

impl PublishArgs {
    fn into_options(self) -> PublishOptions {
        PublishOptions {
            extension_file: self.extension_file,
            package_paths: self.package_paths,
            targets: self.targets,
            pat: resolve_pat(self.pat),
            skip_duplicate: self.skip_duplicate,
            packaging: PackageOptions {
                base_content_url: self.base_content_url,
                base_images_url: self.base_images_url,
                use_yarn: self.yarn,
                dependencies: !self.no_dependencies,
                pre_release: self.pre_release,
                version: self.package_version,
            },
        }
    }
}

pub async fn execute_publish(args: PublishArgs, registry: &RegistryArgs) -> CliResult<()> {
    let client = registry.client()?;
    let resolver = create_resolver(client.clone()).await?;
    let publisher = Arc::new(Publisher::new(
        client,
        resolver,
        Arc::new(CommandPackager::from_env()),
        Arc::new(VsixManifestReader),
        Arc::new(LicenseFileGate::new(Arc::new(InquirePrompt))),
    ));

    let report = publisher.publish_all(args.into_options()).await;
    print_report(&report);

    let failed = report.failures().count();
    if failed > 0 {
        return Err(CliError::PublishFailed {
            failed,
            total: report.outcomes.len(),
        });
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    let total = report.outcomes.len();
    for (index, outcome) in report.outcomes.iter().enumerate() {
        let label = messages::progress(index + 1, total, &outcome.job.describe());
        match &outcome.result {
            Ok(PublishStatus::Published(extension)) => {
                println!("{}", messages::ok(&format!("{} Published {}", label, extension.describe())));
                if let Some(warning) = extension.warning.as_deref().filter(|w| !w.is_empty()) {
                    println!("{}", messages::warning(warning));
                }
            }
            Ok(PublishStatus::Skipped(reason)) => {
                println!("{}", messages::info(&format!("{} {} Skipping publish.", label, reason)));
            }
            Err(e) => {
                eprintln!("{}", messages::error(&format!("{} {}", label, e)));
            }
        }
    }
}
