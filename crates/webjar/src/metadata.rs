//! Package metadata (`package.json`) reader.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, WebjarError};

/// The two fields of `package.json` that define artifact identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Read and validate package metadata.
///
/// A missing file, unparsable JSON, or an empty `name`/`version` is a
/// configuration error; an empty identity would corrupt the staging path and
/// the published coordinates.
pub fn load_metadata(path: &Path) -> Result<PackageMetadata> {
    let content = fs::read_to_string(path).map_err(|e| {
        WebjarError::config(format!(
            "missing package metadata at {}: {e}",
            path.display()
        ))
    })?;

    let meta: PackageMetadata = serde_json::from_str(&content).map_err(|e| {
        WebjarError::config(format!(
            "failed to parse package metadata {}: {e}",
            path.display()
        ))
    })?;

    if meta.name.trim().is_empty() {
        return Err(WebjarError::config(format!(
            "package metadata {} declares no name",
            path.display()
        )));
    }
    if meta.version.trim().is_empty() {
        return Err(WebjarError::config(format!(
            "package metadata {} declares no version",
            path.display()
        )));
    }

    Ok(meta)
}
