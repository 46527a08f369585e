//! Batch publish orchestration
//!
//! One publish request fans out into independent jobs (package paths ×
//! targets). Every job runs to completion on its own task and the batch
//! reports each outcome; a failing job never cancels its siblings.

use crate::core::collaborators::{LicenseGate, ManifestReader, PackageOptions, Packager};
use crate::core::pat::PatResolver;
use crate::core::registry::{CheckedResponse, Extension, RegistryClient};
use crate::core::service::{ServiceError, ServiceResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Suffix marking a path as an already packaged artifact
pub const VSIX_SUFFIX: &str = ".vsix";

/// Registry rejection suffix for a version that already exists
pub const ALREADY_PUBLISHED: &str = "is already published.";

/// File name of the artifact produced when packaging a source directory
const PACKAGED_FILE_NAME: &str = "extension.vsix";

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Pre-built artifact, in which case paths and targets are ignored, or
    /// else one more source directory
    pub extension_file: Option<PathBuf>,
    pub package_paths: Vec<PathBuf>,
    pub targets: Vec<String>,
    pub pat: Option<String>,
    pub skip_duplicate: bool,
    pub packaging: PackageOptions,
}

/// A single unit of publish work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishJob {
    /// Source directory; `None` is the current directory
    pub package_path: Option<PathBuf>,
    pub target: Option<String>,
    pub extension_file: Option<PathBuf>,
}

impl PublishJob {
    fn prebuilt(file: PathBuf) -> Self {
        Self {
            package_path: None,
            target: None,
            extension_file: Some(file),
        }
    }

    /// Human readable label used in reports
    pub fn describe(&self) -> String {
        if let Some(file) = &self.extension_file {
            return file.display().to_string();
        }
        let dir = self
            .package_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ".".to_string());
        match &self.target {
            Some(target) => format!("{} ({})", dir, target),
            None => dir,
        }
    }
}

/// Case-sensitive check on the whole path string
pub fn is_packaged_artifact(path: &Path) -> bool {
    path.to_string_lossy().ends_with(VSIX_SUFFIX)
}

/// Expand options into the jobs to run
///
/// An `extension_file` without the `.vsix` suffix is a source directory and
/// is packaged ahead of `package_paths`.
pub fn expand_jobs(options: &PublishOptions) -> Vec<PublishJob> {
    if let Some(file) = options
        .extension_file
        .as_ref()
        .filter(|f| is_packaged_artifact(f))
    {
        return vec![PublishJob::prebuilt(file.clone())];
    }

    let sources: Vec<PathBuf> = options
        .extension_file
        .iter()
        .chain(&options.package_paths)
        .cloned()
        .collect();
    let paths: Vec<Option<PathBuf>> = if sources.is_empty() {
        vec![None]
    } else {
        sources.into_iter().map(Some).collect()
    };
    let targets: Vec<Option<String>> = if options.targets.is_empty() {
        vec![None]
    } else {
        options.targets.iter().cloned().map(Some).collect()
    };

    let mut jobs = Vec::with_capacity(paths.len() * targets.len());
    for path in &paths {
        for target in &targets {
            let job = match path {
                Some(p) if is_packaged_artifact(p) => PublishJob::prebuilt(p.clone()),
                _ => PublishJob {
                    package_path: path.clone(),
                    target: target.clone(),
                    extension_file: None,
                },
            };
            jobs.push(job);
        }
    }
    jobs
}

#[derive(Debug, Clone)]
pub enum PublishStatus {
    Published(Extension),
    /// The version already existed and skip-duplicate was requested
    Skipped(String),
}

#[derive(Debug)]
pub struct JobOutcome {
    pub job: PublishJob,
    pub result: ServiceResult<PublishStatus>,
}

/// Settled outcomes of a batch, in job order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn successes(&self) -> impl Iterator<Item = (&PublishJob, &PublishStatus)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|s| (&o.job, s)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&PublishJob, &ServiceError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.job, e)))
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

pub struct Publisher {
    client: Arc<RegistryClient>,
    resolver: Arc<PatResolver>,
    packager: Arc<dyn Packager>,
    manifests: Arc<dyn ManifestReader>,
    license: Arc<dyn LicenseGate>,
}

impl Publisher {
    pub fn new(
        client: Arc<RegistryClient>,
        resolver: Arc<PatResolver>,
        packager: Arc<dyn Packager>,
        manifests: Arc<dyn ManifestReader>,
        license: Arc<dyn LicenseGate>,
    ) -> Self {
        Self {
            client,
            resolver,
            packager,
            manifests,
            license,
        }
    }

    /// Run every job concurrently and wait for all of them to settle
    pub async fn publish_all(self: &Arc<Self>, options: PublishOptions) -> BatchReport {
        let options = Arc::new(options);
        let jobs = expand_jobs(&options);

        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let publisher = Arc::clone(self);
                let options = Arc::clone(&options);
                let task_job = job.clone();
                let handle =
                    tokio::spawn(async move { publisher.run_job(&task_job, &options).await });
                (job, handle)
            })
            .collect();

        let mut report = BatchReport::default();
        for (job, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ServiceError::Custom(format!("Publish task failed: {}", e))),
            };
            report.outcomes.push(JobOutcome { job, result });
        }
        report
    }

    async fn run_job(
        &self,
        job: &PublishJob,
        options: &PublishOptions,
    ) -> ServiceResult<PublishStatus> {
        // The packaging directory must outlive the upload
        let (artifact, _workdir) = match &job.extension_file {
            Some(file) => {
                if options.packaging.pre_release {
                    warn!(
                        "The --pre-release flag is ignored for pre-built artifact {}",
                        file.display()
                    );
                }
                (file.clone(), None)
            }
            None => {
                let source_dir = job
                    .package_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."));
                if self.client.requires_license() {
                    self.license.check(&source_dir).await?;
                }

                let dir = tempfile::tempdir()?;
                let out_file = dir.path().join(PACKAGED_FILE_NAME);
                self.packager
                    .package(
                        &source_dir,
                        job.target.as_deref(),
                        &options.packaging,
                        &out_file,
                    )
                    .await?;
                (out_file, Some(dir))
            }
        };

        let token = match options.pat.as_deref().filter(|p| !p.is_empty()) {
            Some(pat) => pat.to_string(),
            None => {
                let manifest = self.manifests.read_manifest(&artifact).await?;
                let namespace = manifest.publisher()?;
                self.resolver.resolve(namespace, None, false).await?
            }
        };

        let published = self
            .client
            .publish(&artifact, &token)
            .await
            .and_then(CheckedResponse::check);

        match published {
            Ok(extension) => {
                info!("Published {}", extension.describe());
                if let Some(warning) = extension.warning.as_deref().filter(|w| !w.is_empty()) {
                    warn!("{}", warning);
                }
                Ok(PublishStatus::Published(extension))
            }
            Err(e) if options.skip_duplicate && e.to_string().ends_with(ALREADY_PUBLISHED) => {
                let message = e.to_string();
                info!("{} Skipping publish.", message);
                Ok(PublishStatus::Skipped(message))
            }
            Err(e) => Err(e.into()),
        }
    }
}
