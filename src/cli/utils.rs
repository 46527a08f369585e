//! Utility functions for CLI operations

pub mod messages;

use crate::cli::error::{CliError, CliResult};
use std::path::Path;
use vsxpub::core::collaborators::Manifest;

/// Publisher declared in `<dir>/package.json`
pub fn manifest_publisher(dir: &Path) -> CliResult<String> {
    let manifest = Manifest::from_source_dir(dir)?;
    let publisher = manifest.publisher().map_err(|_| {
        CliError::Validation(format!(
            "No namespace given and {} declares no `publisher`",
            dir.join("package.json").display()
        ))
    })?;
    Ok(publisher.to_string())
}
