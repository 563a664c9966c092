use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker inserted between the raw version and the timestamp of a snapshot.
pub const SNAPSHOT_MARKER: &str = "-SNAPSHOT-";

/// Archive type handed to the packager.
pub const DEFAULT_PACKAGING: &str = "jar";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository id; Maven matches it against `<server>` credentials in settings.xml.
    pub id: String,
    pub url: String,
}

impl Repository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repositories {
    pub releases: Vec<Repository>,
    pub snapshots: Vec<Repository>,
}

impl Repositories {
    pub fn liferay_public() -> Self {
        Self {
            releases: vec![Repository::new(
                "liferay-public-releases",
                "https://repository.liferay.com/nexus/content/repositories/liferay-public-releases/",
            )],
            snapshots: vec![Repository::new(
                "liferay-public-snapshots",
                "https://repository.liferay.com/nexus/content/repositories/liferay-public-snapshots/",
            )],
        }
    }

    pub fn for_channel(&self, snapshot: bool) -> &[Repository] {
        if snapshot {
            &self.snapshots
        } else {
            &self.releases
        }
    }
}

impl Default for Repositories {
    fn default() -> Self {
        Self::liferay_public()
    }
}

/// Resolved coordinates of one webjar build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactIdentity {
    pub name: String,
    pub version: String,
    pub final_name: String,
    pub artifact_id: String,
    pub group_id: String,
    pub snapshot: bool,
}

/// Input to the packager for both install and deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRequest {
    pub artifact_id: String,
    pub build_dir: PathBuf,
    pub final_name: String,
    pub group_id: String,
    /// Archive type, e.g. `jar`.
    pub packaging: String,
    pub version: String,
}

impl PackageRequest {
    pub fn archive_file_name(&self) -> String {
        format!("{}.{}", self.final_name, self.packaging)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub kind: PromptKind,
    pub message: String,
    /// Name of the answer field, e.g. `webjarPath`.
    pub field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub pipeline: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Identity used by every step of the run, if any step needed one.
    pub identity: Option<ArtifactIdentity>,
    /// Local repository path entered during initialization, if the run had one.
    pub local_repository: Option<String>,
    pub steps: Vec<StepRecord>,
}
