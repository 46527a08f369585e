//! Extension lookup and download

use crate::core::registry::{CheckedResponse, Extension, RegistryClient};
use crate::core::service::{ServiceError, ServiceResult};
use regex::Regex;
use semver::{Version, VersionReq};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, info};

static EXTENSION_ID: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^([\w-]+)\.([\w-]+)$").expect("extension id pattern is valid")
});

/// `namespace.extension`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionId {
    pub namespace: String,
    pub name: String,
}

impl FromStr for ExtensionId {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = EXTENSION_ID.captures(s).ok_or_else(|| {
            ServiceError::Validation(
                "The extension identifier must have the form `namespace.extension`.".to_string(),
            )
        })?;
        Ok(Self {
            namespace: captures[1].to_string(),
            name: captures[2].to_string(),
        })
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Fetch metadata for `id`, narrowed to the highest version matching `range`
pub async fn resolve_extension(
    client: &RegistryClient,
    id: &ExtensionId,
    target: Option<&str>,
    range: Option<&str>,
) -> ServiceResult<Extension> {
    let extension = client
        .get_metadata(&id.namespace, &id.name, target, None)
        .await?
        .check()?;

    let Some(range) = range.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(extension);
    };

    let version = select_version(&extension, range)?;
    if version.to_string() == extension.version {
        return Ok(extension);
    }

    debug!("Version range '{}' of {} resolved to {}", range, id, version);
    let extension = client
        .get_metadata(&id.namespace, &id.name, target, Some(&version.to_string()))
        .await?
        .check()?;
    Ok(extension)
}

/// Highest published version satisfying `range`
///
/// Keys of `allVersions` that are not versions (`latest`, `pre-release`) are
/// skipped. The current version is a candidate even if absent from the list.
pub fn select_version(extension: &Extension, range: &str) -> ServiceResult<Version> {
    let requirement = VersionReq::parse(range).map_err(|e| {
        ServiceError::Validation(format!("Invalid version range '{}': {}", range, e))
    })?;

    extension
        .all_versions
        .keys()
        .map(String::as_str)
        .chain(std::iter::once(extension.version.as_str()))
        .filter_map(|v| Version::parse(v).ok())
        .filter(|v| requirement.matches(v))
        .max()
        .ok_or_else(|| {
            ServiceError::Validation(format!(
                "Extension {}.{} has no published version matching '{}'",
                extension.namespace, extension.name, range
            ))
        })
}

/// `<namespace>.<name>-<version>[@<target>].vsix`
pub fn default_file_name(extension: &Extension) -> String {
    let mut name = format!(
        "{}.{}-{}",
        extension.namespace, extension.name, extension.version
    );
    if let Some(target) = extension
        .target_platform
        .as_deref()
        .filter(|t| *t != "universal")
    {
        name.push('@');
        name.push_str(target);
    }
    name.push_str(".vsix");
    name
}

/// Where the artifact lands: the default name in the working directory,
/// inside `output` when it is a directory, or `output` itself
pub fn output_path(extension: &Extension, output: Option<&Path>) -> PathBuf {
    match output {
        Some(dir) if dir.is_dir() => dir.join(default_file_name(extension)),
        Some(file) => file.to_path_buf(),
        None => PathBuf::from(default_file_name(extension)),
    }
}

/// Download the artifact of `extension` and return the written path
pub async fn download_extension(
    client: &RegistryClient,
    extension: &Extension,
    output: Option<&Path>,
) -> ServiceResult<PathBuf> {
    let url = extension.download_url().ok_or_else(|| {
        ServiceError::Validation(format!(
            "Extension {} has no download URL",
            extension.describe()
        ))
    })?;

    let dest = output_path(extension, output);
    client.download(&dest, url).await?;
    info!("Downloaded {} to {}", extension.describe(), dest.display());
    Ok(dest)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn extension(version: &str, versions: &[&str]) -> Extension {
        Extension {
            namespace: "redhat".to_string(),
            name: "java".to_string(),
            version: version.to_string(),
            all_versions: versions
                .iter()
                .map(|v| (v.to_string(), format!("https://open-vsx.org/api/redhat/java/{}", v)))
                .collect::<BTreeMap<_, _>>(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_extension_id() {
        let id: ExtensionId = "redhat.java".parse().unwrap();
        assert_eq!(id.namespace, "redhat");
        assert_eq!(id.name, "java");
        assert_eq!(id.to_string(), "redhat.java");

        let id: ExtensionId = "my-org.my_ext-2".parse().unwrap();
        assert_eq!(id.namespace, "my-org");
    }

    #[test]
    fn test_invalid_extension_ids() {
        for raw in ["redhat", "redhat.java.extra", ".java", "red hat.java", ""] {
            let err = raw.parse::<ExtensionId>().unwrap_err();
            assert_eq!(
                err.to_string(),
                "Validation error: The extension identifier must have the form `namespace.extension`."
            );
        }
    }

    #[test]
    fn test_select_highest_matching_version() {
        let ext = extension("2.0.0", &["latest", "1.0.0", "1.4.2", "1.10.0", "2.0.0"]);
        assert_eq!(select_version(&ext, "^1.0").unwrap(), Version::new(1, 10, 0));
        assert_eq!(select_version(&ext, ">=2").unwrap(), Version::new(2, 0, 0));
        assert!(select_version(&ext, "^3").is_err());
        assert!(select_version(&ext, "not a range").is_err());
    }

    #[test]
    fn test_default_file_name() {
        let mut ext = extension("1.2.0", &[]);
        assert_eq!(default_file_name(&ext), "redhat.java-1.2.0.vsix");

        ext.target_platform = Some("universal".to_string());
        assert_eq!(default_file_name(&ext), "redhat.java-1.2.0.vsix");

        ext.target_platform = Some("linux-x64".to_string());
        assert_eq!(default_file_name(&ext), "redhat.java-1.2.0@linux-x64.vsix");
    }

    #[test]
    fn test_output_path_variants() {
        let temp_dir = TempDir::new().unwrap();
        let ext = extension("1.2.0", &[]);

        assert_eq!(
            output_path(&ext, Some(temp_dir.path())),
            temp_dir.path().join("redhat.java-1.2.0.vsix")
        );

        let file = temp_dir.path().join("custom.vsix");
        assert_eq!(output_path(&ext, Some(&file)), file);
        assert_eq!(output_path(&ext, None), PathBuf::from("redhat.java-1.2.0.vsix"));
    }
}
