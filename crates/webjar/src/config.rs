//! Configuration resolution for webjar builds.
//!
//! Options come from three layers, highest priority first: CLI flags, an
//! optional `webjar.toml` in the working directory, and built-in defaults.
//! [`WebjarOptions`] carries the overrides (every field optional) and
//! [`WebjarOptions::resolve`] fills the rest.
//!
//! Artifact identity is *not* part of the resolved record. `name()` and
//! `version()` read `package.json` on every call, so two snapshot versions
//! taken at different instants differ; pipelines memoize one
//! [`ArtifactIdentity`] per run instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, WebjarError};
use crate::metadata::load_metadata;
use crate::types::{
    ArtifactIdentity, DEFAULT_PACKAGING, Repositories, Repository, SNAPSHOT_MARKER,
};

pub const CONFIG_FILE: &str = "webjar.toml";
pub const DEFAULT_ARTIFACT_ID_PREFIX: &str = "com.liferay.webjars.";
pub const DEFAULT_GROUP_ID: &str = "com.liferay.webjars";
pub const DEFAULT_PACKAGE_JSON: &str = "package.json";
pub const DEFAULT_STAGING_DIR: &str = "maven-dist";
pub const DEFAULT_OUTPUT_LINES: usize = 50;

/// Environment variable naming the Maven executable.
pub const MVN_BIN_ENV: &str = "WEBJAR_MVN_BIN";

/// Everything except the dependency-install directory.
pub fn default_sources() -> Vec<String> {
    vec![
        "**/*".to_string(),
        "!node_modules/".to_string(),
        "!node_modules/**".to_string(),
    ]
}

/// Caller-supplied overrides. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebjarOptions {
    pub artifact_id_prefix: Option<String>,
    pub artifact_name: Option<String>,
    pub group_id: Option<String>,
    pub artifact_src: Option<Vec<String>>,
    pub package_json_path: Option<PathBuf>,
    pub repositories: Option<Repositories>,
    pub staging_dir: Option<PathBuf>,
    pub settings_template: Option<PathBuf>,
    pub maven_command: Option<String>,
    pub maven_timeout: Option<Duration>,
    pub output_lines: Option<usize>,
}

impl WebjarOptions {
    /// Layer `over` on top of `self`; fields set in `over` win.
    pub fn merge(self, over: WebjarOptions) -> WebjarOptions {
        WebjarOptions {
            artifact_id_prefix: over.artifact_id_prefix.or(self.artifact_id_prefix),
            artifact_name: over.artifact_name.or(self.artifact_name),
            group_id: over.group_id.or(self.group_id),
            artifact_src: over.artifact_src.or(self.artifact_src),
            package_json_path: over.package_json_path.or(self.package_json_path),
            repositories: over.repositories.or(self.repositories),
            staging_dir: over.staging_dir.or(self.staging_dir),
            settings_template: over.settings_template.or(self.settings_template),
            maven_command: over.maven_command.or(self.maven_command),
            maven_timeout: over.maven_timeout.or(self.maven_timeout),
            output_lines: over.output_lines.or(self.output_lines),
        }
    }

    /// Fill every unset field with its default. Relative paths resolve
    /// against `work_dir`. Pure: touches no files.
    pub fn resolve(self, work_dir: &Path) -> WebjarConfig {
        let absolute = |p: PathBuf| {
            if p.is_absolute() {
                p
            } else {
                work_dir.join(p)
            }
        };

        WebjarConfig {
            work_dir: work_dir.to_path_buf(),
            artifact_id_prefix: self
                .artifact_id_prefix
                .unwrap_or_else(|| DEFAULT_ARTIFACT_ID_PREFIX.to_string()),
            artifact_name: self.artifact_name,
            group_id: self.group_id.unwrap_or_else(|| DEFAULT_GROUP_ID.to_string()),
            artifact_src: self.artifact_src.unwrap_or_else(default_sources),
            package_json_path: absolute(
                self.package_json_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PACKAGE_JSON)),
            ),
            repositories: self.repositories.unwrap_or_default(),
            staging_dir: absolute(
                self.staging_dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STAGING_DIR)),
            ),
            settings_template: self.settings_template.map(&absolute),
            maven_command: self.maven_command,
            maven_timeout: self.maven_timeout,
            output_lines: self.output_lines.unwrap_or(DEFAULT_OUTPUT_LINES),
        }
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebjarConfig {
    pub work_dir: PathBuf,
    pub artifact_id_prefix: String,
    /// Explicit artifact name; `None` falls back to `package.json`.
    pub artifact_name: Option<String>,
    pub group_id: String,
    pub artifact_src: Vec<String>,
    pub package_json_path: PathBuf,
    pub repositories: Repositories,
    /// Staging root (`maven-dist`), absolute.
    pub staging_dir: PathBuf,
    /// `None` uses the template bundled with the crate.
    pub settings_template: Option<PathBuf>,
    /// Explicit Maven executable; `None` falls back to `$WEBJAR_MVN_BIN`, then `mvn`.
    pub maven_command: Option<String>,
    pub maven_timeout: Option<Duration>,
    pub output_lines: usize,
}

impl WebjarConfig {
    pub fn name(&self) -> Result<String> {
        if let Some(name) = &self.artifact_name {
            return Ok(name.clone());
        }
        Ok(load_metadata(&self.package_json_path)?.name)
    }

    /// Raw version, or `<version>-SNAPSHOT-<epoch millis>` when `snapshot`.
    ///
    /// Recomputed on every call.
    pub fn version(&self, snapshot: bool) -> Result<String> {
        let raw = load_metadata(&self.package_json_path)?.version;
        Ok(if snapshot {
            snapshot_version(&raw, Utc::now().timestamp_millis())
        } else {
            raw
        })
    }

    pub fn final_name(&self, snapshot: bool) -> Result<String> {
        Ok(format!("{}-{}", self.name()?, self.version(snapshot)?))
    }

    /// Build a complete identity from one metadata read and one timestamp.
    pub fn identity(&self, snapshot: bool) -> Result<ArtifactIdentity> {
        self.identity_at(snapshot, Utc::now().timestamp_millis())
    }

    pub fn identity_at(&self, snapshot: bool, timestamp_millis: i64) -> Result<ArtifactIdentity> {
        let meta = load_metadata(&self.package_json_path)?;
        let name = self.artifact_name.clone().unwrap_or(meta.name);
        let version = if snapshot {
            snapshot_version(&meta.version, timestamp_millis)
        } else {
            meta.version
        };

        Ok(ArtifactIdentity {
            final_name: format!("{name}-{version}"),
            artifact_id: format!("{}{}", self.artifact_id_prefix, name),
            group_id: self.group_id.clone(),
            name,
            version,
            snapshot,
        })
    }

    /// `<staging>/META-INF/resources/webjars/<name>/<version>`.
    pub fn webjar_dir(&self, identity: &ArtifactIdentity) -> PathBuf {
        self.staging_dir
            .join("META-INF")
            .join("resources")
            .join("webjars")
            .join(&identity.name)
            .join(&identity.version)
    }

    pub fn packaging(&self) -> &str {
        DEFAULT_PACKAGING
    }

    /// Maven executable: config, then `$WEBJAR_MVN_BIN`, then `mvn`.
    pub fn maven_program(&self) -> String {
        self.maven_command
            .clone()
            .or_else(|| std::env::var(MVN_BIN_ENV).ok())
            .unwrap_or_else(|| "mvn".to_string())
    }
}

pub fn snapshot_version(raw: &str, timestamp_millis: i64) -> String {
    format!("{raw}{SNAPSHOT_MARKER}{timestamp_millis}")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id_prefix: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesSection {
    /// Gulp-style patterns; `!` prefixes an exclusion.
    #[serde(default)]
    pub patterns: Option<Vec<String>>,
    #[serde(default)]
    pub package_json: Option<PathBuf>,
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoriesSection {
    #[serde(default)]
    pub releases: Option<Vec<Repository>>,
    #[serde(default)]
    pub snapshots: Option<Vec<Repository>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MavenSection {
    #[serde(default)]
    pub command: Option<String>,
    /// e.g. `10m`; no timeout when absent.
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub output_lines: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsSection {
    #[serde(default)]
    pub template: Option<PathBuf>,
}

/// Contents of `webjar.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebjarFileConfig {
    #[serde(default)]
    pub artifact: ArtifactSection,
    #[serde(default)]
    pub sources: SourcesSection,
    #[serde(default)]
    pub repositories: RepositoriesSection,
    #[serde(default)]
    pub maven: MavenSection,
    #[serde(default)]
    pub settings: SettingsSection,
}

impl WebjarFileConfig {
    /// Load `webjar.toml` from `work_dir`.
    ///
    /// Returns `Ok(None)` if no config file exists.
    pub fn load_from_dir(work_dir: &Path) -> Result<Option<Self>> {
        let path = work_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from_file(&path).map(Some)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            WebjarError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;

        let config: WebjarFileConfig = toml::from_str(&content).map_err(|e| {
            WebjarError::config(format!("failed to parse config file {}: {e}", path.display()))
        })?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.maven.output_lines == Some(0) {
            return Err(WebjarError::config(
                "maven.output_lines must be greater than 0",
            ));
        }
        if self.maven.timeout.is_some_and(|t| t.is_zero()) {
            return Err(WebjarError::config("maven.timeout must be greater than 0"));
        }
        let repos = self
            .repositories
            .releases
            .iter()
            .chain(self.repositories.snapshots.iter())
            .flatten();
        for repo in repos {
            if repo.id.trim().is_empty() || repo.url.trim().is_empty() {
                return Err(WebjarError::config(
                    "repository entries need a non-empty id and url",
                ));
            }
        }
        Ok(())
    }

    /// Convert to overrides. Each repository list is defaulted on its own,
    /// so a file that only names snapshot endpoints keeps the release ones.
    pub fn into_options(self) -> WebjarOptions {
        let repositories = match (self.repositories.releases, self.repositories.snapshots) {
            (None, None) => None,
            (releases, snapshots) => {
                let defaults = Repositories::default();
                Some(Repositories {
                    releases: releases.unwrap_or(defaults.releases),
                    snapshots: snapshots.unwrap_or(defaults.snapshots),
                })
            }
        };

        WebjarOptions {
            artifact_id_prefix: self.artifact.id_prefix,
            artifact_name: self.artifact.name,
            group_id: self.artifact.group_id,
            artifact_src: self.sources.patterns,
            package_json_path: self.sources.package_json,
            repositories,
            staging_dir: self.sources.staging_dir,
            settings_template: self.settings.template,
            maven_command: self.maven.command,
            maven_timeout: self.maven.timeout,
            output_lines: self.maven.output_lines,
        }
    }
}

fn deserialize_opt_duration<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}
