//! Seams to the collaborators the publish flow depends on
//!
//! Packaging, manifest inspection, license acceptance and token prompting
//! are consumed through the traits below. The default implementations shell
//! out to `vsce`, read `extension/package.json` from the `.vsix` archive and
//! prompt through `inquire`.

use crate::core::service::{ServiceError, ServiceResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

/// Held while an interactive prompt owns the terminal
static TERMINAL: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Environment variable naming the packaging command
pub const VSCE_ENV: &str = "VSXPUB_VSCE";

/// Options forwarded to the packager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOptions {
    pub base_content_url: Option<String>,
    pub base_images_url: Option<String>,
    pub use_yarn: bool,
    /// Include dependencies (`false` maps to `--no-dependencies`)
    pub dependencies: bool,
    pub pre_release: bool,
    pub version: Option<String>,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            base_content_url: None,
            base_images_url: None,
            use_yarn: false,
            dependencies: true,
            pre_release: false,
            version: None,
        }
    }
}

/// Extension manifest fields relevant to publishing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl Manifest {
    /// Read `package.json` from an extension source directory
    pub fn from_source_dir(dir: &Path) -> ServiceResult<Self> {
        let path = dir.join("package.json");
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ServiceError::Validation(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(content: &str, origin: &str) -> ServiceResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| ServiceError::Validation(format!("Invalid manifest {}: {}", origin, e)))
    }

    /// The namespace the extension is published under
    pub fn publisher(&self) -> ServiceResult<&str> {
        self.publisher
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                ServiceError::Validation(
                    "Extension manifest is missing the `publisher` field".to_string(),
                )
            })
    }
}

/// Produces a packaged artifact from an extension source directory
#[async_trait::async_trait]
pub trait Packager: Send + Sync {
    async fn package(
        &self,
        source_dir: &Path,
        target: Option<&str>,
        options: &PackageOptions,
        out_file: &Path,
    ) -> ServiceResult<()>;
}

/// Reads the manifest embedded in a packaged artifact
#[async_trait::async_trait]
pub trait ManifestReader: Send + Sync {
    async fn read_manifest(&self, artifact: &Path) -> ServiceResult<Manifest>;
}

/// Confirms the extension may be packaged with respect to its license
#[async_trait::async_trait]
pub trait LicenseGate: Send + Sync {
    async fn check(&self, source_dir: &Path) -> ServiceResult<()>;
}

/// Asks the user for a namespace token
#[async_trait::async_trait]
pub trait TokenPrompt: Send + Sync {
    async fn request_token(&self, namespace: &str) -> ServiceResult<String>;
}

/// Asks the user a yes/no question; a cancelled question is a no
#[async_trait::async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> ServiceResult<bool>;
}

/// Packages by running a `vsce` compatible command
pub struct CommandPackager {
    program: String,
}

impl CommandPackager {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command from `VSXPUB_VSCE`, defaulting to `vsce`
    pub fn from_env() -> Self {
        Self::new(std::env::var(VSCE_ENV).unwrap_or_else(|_| "vsce".to_string()))
    }

    fn args(target: Option<&str>, options: &PackageOptions, out_file: &Path) -> Vec<String> {
        let mut args = vec![
            "package".to_string(),
            "--out".to_string(),
            out_file.display().to_string(),
        ];
        if let Some(target) = target {
            args.extend(["--target".to_string(), target.to_string()]);
        }
        if let Some(url) = &options.base_content_url {
            args.extend(["--baseContentUrl".to_string(), url.clone()]);
        }
        if let Some(url) = &options.base_images_url {
            args.extend(["--baseImagesUrl".to_string(), url.clone()]);
        }
        if options.use_yarn {
            args.push("--yarn".to_string());
        }
        if !options.dependencies {
            args.push("--no-dependencies".to_string());
        }
        if options.pre_release {
            args.push("--pre-release".to_string());
        }
        if let Some(version) = &options.version {
            args.push(version.clone());
        }
        args
    }
}

#[async_trait::async_trait]
impl Packager for CommandPackager {
    async fn package(
        &self,
        source_dir: &Path,
        target: Option<&str>,
        options: &PackageOptions,
        out_file: &Path,
    ) -> ServiceResult<()> {
        let args = Self::args(target, options, out_file);
        debug!("Running {} {} in {}", self.program, args.join(" "), source_dir.display());

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(source_dir)
            .output()
            .await
            .map_err(|e| ServiceError::Packaging(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::Packaging(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        if !out_file.exists() {
            return Err(ServiceError::Packaging(format!(
                "{} did not produce {}",
                self.program,
                out_file.display()
            )));
        }
        Ok(())
    }
}

/// Reads `extension/package.json` out of a `.vsix` archive
pub struct VsixManifestReader;

const VSIX_MANIFEST_ENTRY: &str = "extension/package.json";

fn read_vsix_manifest(artifact: &Path) -> ServiceResult<Manifest> {
    let file = std::fs::File::open(artifact)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        ServiceError::Validation(format!("{} is not a valid .vsix archive: {}", artifact.display(), e))
    })?;
    let mut entry = archive.by_name(VSIX_MANIFEST_ENTRY).map_err(|_| {
        ServiceError::Validation(format!(
            "{} does not contain {}",
            artifact.display(),
            VSIX_MANIFEST_ENTRY
        ))
    })?;

    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Manifest::parse(&content, &artifact.display().to_string())
}

#[async_trait::async_trait]
impl ManifestReader for VsixManifestReader {
    async fn read_manifest(&self, artifact: &Path) -> ServiceResult<Manifest> {
        let artifact = artifact.to_path_buf();
        tokio::task::spawn_blocking(move || read_vsix_manifest(&artifact))
            .await
            .map_err(|e| ServiceError::Custom(format!("Manifest task failed: {}", e)))?
    }
}

/// Accepts sources shipping a LICENSE file; otherwise asks for confirmation
///
/// The answer is remembered per source directory, so jobs packaging the same
/// directory for several targets ask only once.
pub struct LicenseFileGate {
    prompt: Arc<dyn ConfirmPrompt>,
    decisions: Mutex<HashMap<PathBuf, bool>>,
}

impl LicenseFileGate {
    pub fn new(prompt: Arc<dyn ConfirmPrompt>) -> Self {
        Self {
            prompt,
            decisions: Mutex::new(HashMap::new()),
        }
    }
}

fn find_license_file(source_dir: &Path) -> std::io::Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(source_dir)? {
        let path = entry?.path();
        let is_license = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_ascii_lowercase().starts_with("license"));
        if is_license && path.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[async_trait::async_trait]
impl LicenseGate for LicenseFileGate {
    async fn check(&self, source_dir: &Path) -> ServiceResult<()> {
        let dir = source_dir.to_path_buf();
        let (found, key) = tokio::task::spawn_blocking(move || {
            let found = find_license_file(&dir)?;
            let key = std::fs::canonicalize(&dir).unwrap_or(dir);
            Ok::<_, std::io::Error>((found, key))
        })
        .await
        .map_err(|e| ServiceError::Custom(format!("License check task failed: {}", e)))??;
        if found.is_some() {
            return Ok(());
        }

        let display = source_dir.display().to_string();
        let mut decisions = self.decisions.lock().await;
        let accepted = match decisions.get(&key).copied() {
            Some(accepted) => accepted,
            None => {
                let message = format!("LICENSE not found in {}. Do you want to continue?", display);
                let accepted = self.prompt.confirm(&message).await.map_err(|e| {
                    ServiceError::License(format!(
                        "No LICENSE file found in {} and confirmation is unavailable: {}",
                        display, e
                    ))
                })?;
                decisions.insert(key, accepted);
                accepted
            }
        };

        if accepted {
            Ok(())
        } else {
            Err(ServiceError::License(format!(
                "Packaging of {} aborted: no LICENSE file found",
                display
            )))
        }
    }
}

/// Terminal prompts through `inquire`, one at a time
pub struct InquirePrompt;

#[async_trait::async_trait]
impl TokenPrompt for InquirePrompt {
    async fn request_token(&self, namespace: &str) -> ServiceResult<String> {
        let _terminal = TERMINAL.lock().await;
        let message = format!("Personal Access Token for namespace '{}':", namespace);
        let answer = tokio::task::spawn_blocking(move || {
            inquire::Password::new(&message)
                .with_display_mode(inquire::PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt()
        })
        .await
        .map_err(|e| ServiceError::Custom(format!("Token prompt failed: {}", e)))?;

        let token = answer
            .map_err(|e| ServiceError::Validation(format!("No token entered: {}", e)))?
            .trim()
            .to_string();
        if token.is_empty() {
            return Err(ServiceError::Validation(format!(
                "A personal access token is required for namespace '{}'",
                namespace
            )));
        }
        Ok(token)
    }
}

#[async_trait::async_trait]
impl ConfirmPrompt for InquirePrompt {
    async fn confirm(&self, message: &str) -> ServiceResult<bool> {
        let _terminal = TERMINAL.lock().await;
        let message = message.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            inquire::Confirm::new(&message).with_default(false).prompt()
        })
        .await
        .map_err(|e| ServiceError::Custom(format!("Confirmation prompt failed: {}", e)))?;

        match answer {
            Ok(accepted) => Ok(accepted),
            Err(inquire::InquireError::OperationCanceled) => Ok(false),
            Err(e) => Err(ServiceError::Validation(e.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;
    use zip::{write::FileOptions, ZipWriter};

    fn write_vsix(path: &Path, manifest: Option<&str>) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file("extension.vsixmanifest", options).unwrap();
        zip.write_all(b"<PackageManifest/>").unwrap();
        if let Some(manifest) = manifest {
            zip.start_file(VSIX_MANIFEST_ENTRY, options).unwrap();
            zip.write_all(manifest.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_reads_publisher_from_vsix() {
        let temp_dir = TempDir::new().unwrap();
        let vsix = temp_dir.path().join("ext.vsix");
        write_vsix(
            &vsix,
            Some(r#"{"name":"hello","publisher":"acme","version":"1.0.0"}"#),
        );

        let manifest = VsixManifestReader.read_manifest(&vsix).await.unwrap();
        assert_eq!(manifest.publisher().unwrap(), "acme");
        assert_eq!(manifest.name.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_missing_manifest_entry() {
        let temp_dir = TempDir::new().unwrap();
        let vsix = temp_dir.path().join("ext.vsix");
        write_vsix(&vsix, None);

        let err = VsixManifestReader.read_manifest(&vsix).await.unwrap_err();
        assert!(err.to_string().contains(VSIX_MANIFEST_ENTRY));
    }

    #[test]
    fn test_missing_publisher_is_validation_error() {
        let manifest = Manifest::parse(r#"{"name":"hello"}"#, "package.json").unwrap();
        assert!(matches!(manifest.publisher(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_manifest_from_source_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("package.json"),
            r#"{"name":"hello","publisher":"acme"}"#,
        )
        .unwrap();
        let manifest = Manifest::from_source_dir(temp_dir.path()).unwrap();
        assert_eq!(manifest.publisher().unwrap(), "acme");
    }

    #[test]
    fn test_packager_arguments() {
        let options = PackageOptions {
            base_content_url: Some("https://example.com/content".to_string()),
            use_yarn: true,
            dependencies: false,
            pre_release: true,
            version: Some("2.0.0".to_string()),
            ..Default::default()
        };
        let args = CommandPackager::args(Some("linux-x64"), &options, Path::new("/tmp/out.vsix"));
        assert_eq!(
            args,
            vec![
                "package",
                "--out",
                "/tmp/out.vsix",
                "--target",
                "linux-x64",
                "--baseContentUrl",
                "https://example.com/content",
                "--yarn",
                "--no-dependencies",
                "--pre-release",
                "2.0.0",
            ]
        );
    }

    /// Answers every question the same way and records how it was asked
    struct ScriptedConfirm {
        answer: bool,
        asked: AtomicUsize,
        active: AtomicUsize,
        overlapped: AtomicBool,
    }

    impl ScriptedConfirm {
        fn new(answer: bool) -> Arc<Self> {
            Arc::new(Self {
                answer,
                asked: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                overlapped: AtomicBool::new(false),
            })
        }
    }

    #[async_trait::async_trait]
    impl ConfirmPrompt for ScriptedConfirm {
        async fn confirm(&self, _message: &str) -> ServiceResult<bool> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    async fn check_concurrently(gate: Arc<LicenseFileGate>, dirs: Vec<PathBuf>) -> Vec<ServiceResult<()>> {
        let handles: Vec<_> = dirs
            .into_iter()
            .map(|dir| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.check(&dir).await })
            })
            .collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    #[tokio::test]
    async fn test_license_file_accepted_without_prompt() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("LICENSE.md"), "MIT").unwrap();
        let prompt = ScriptedConfirm::new(false);
        let gate = LicenseFileGate::new(prompt.clone());
        assert!(gate.check(temp_dir.path()).await.is_ok());
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_directory_is_asked_once() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = ScriptedConfirm::new(true);
        let gate = Arc::new(LicenseFileGate::new(prompt.clone()));

        let dirs = vec![temp_dir.path().to_path_buf(); 3];
        let results = check_concurrently(gate, dirs).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_prompts_for_different_directories_do_not_overlap() {
        let temp_dir = TempDir::new().unwrap();
        let dirs: Vec<PathBuf> = ["a", "b", "c"]
            .iter()
            .map(|name| {
                let dir = temp_dir.path().join(name);
                std::fs::create_dir(&dir).unwrap();
                dir
            })
            .collect();
        let prompt = ScriptedConfirm::new(false);
        let gate = Arc::new(LicenseFileGate::new(prompt.clone()));

        let results = check_concurrently(gate, dirs).await;

        assert_eq!(prompt.asked.load(Ordering::SeqCst), 3);
        assert!(!prompt.overlapped.load(Ordering::SeqCst));
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(ServiceError::License(_)))));
    }

    #[tokio::test]
    async fn test_failing_packager_command() {
        let temp_dir = TempDir::new().unwrap();
        let packager = CommandPackager::new("vsxpub-no-such-packager");
        let err = packager
            .package(
                temp_dir.path(),
                None,
                &PackageOptions::default(),
                &temp_dir.path().join("out.vsix"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Packaging(_)));
    }
}
