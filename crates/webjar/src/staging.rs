//! Staging tree management.
//!
//! Sources are selected with gulp-style patterns (`**/*`, `!node_modules/**`)
//! relative to the working directory and copied into
//! `<staging>/META-INF/resources/webjars/<name>/<version>/`, the layout a
//! servlet container serves webjar assets from.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::{CONFIG_FILE, WebjarConfig};
use crate::error::{Result, WebjarError};
use crate::pipeline::Reporter;
use crate::types::ArtifactIdentity;

/// Include/exclude matcher built from gulp-style patterns.
///
/// Like gulp, wildcards never match hidden (`.`-prefixed) path components.
/// A hidden file or directory is only selected by a pattern that names a
/// `.` segment itself, e.g. `.well-known/**`.
#[derive(Debug, Clone)]
pub struct SourceSelector {
    include: GlobSet,
    /// Include patterns with a `.`-prefixed segment.
    include_hidden: GlobSet,
    exclude: GlobSet,
}

impl SourceSelector {
    /// Patterns starting with `!` are exclusions; everything else includes.
    /// A trailing `/` on an exclusion matches the directory itself.
    pub fn from_patterns(patterns: &[String]) -> Result<Self> {
        let mut include = GlobSetBuilder::new();
        let mut include_hidden = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();

        for raw in patterns {
            let (negated, pattern) = match raw.trim().strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw.trim()),
            };
            let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
            if pattern.is_empty() {
                continue;
            }

            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| WebjarError::config(format!("invalid source pattern {raw:?}: {e}")))?;

            if negated {
                exclude.add(glob);
            } else if names_hidden(pattern) {
                include_hidden.add(glob);
            } else {
                include.add(glob);
            }
        }

        let build = |b: GlobSetBuilder| {
            b.build()
                .map_err(|e| WebjarError::config(format!("invalid source patterns: {e}")))
        };

        Ok(Self {
            include: build(include)?,
            include_hidden: build(include_hidden)?,
            exclude: build(exclude)?,
        })
    }

    pub fn is_included(&self, rel: &Path) -> bool {
        let s = to_slash(rel);
        if self.exclude.is_match(&s) {
            return false;
        }
        if is_hidden(rel) {
            self.include_hidden.is_match(&s)
        } else {
            self.include.is_match(&s) || self.include_hidden.is_match(&s)
        }
    }

    /// Whether a directory, and so everything below it, is skipped. Hidden
    /// directories are skipped unless some pattern names a hidden segment.
    pub fn is_pruned_dir(&self, rel: &Path) -> bool {
        let s = to_slash(rel);
        self.exclude.is_match(&s)
            || self.exclude.is_match(format!("{s}/"))
            || (self.include_hidden.is_empty() && is_hidden(rel))
    }

    /// Relative paths of all selected files under `root`, sorted, never
    /// descending into or returning anything under `skip`.
    pub fn collect(&self, root: &Path, skip: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_entry(|entry| {
                let path = entry.path();
                if skip.iter().any(|s| path.starts_with(s)) {
                    return false;
                }
                match path.strip_prefix(root) {
                    Ok(rel) if entry.file_type().is_dir() && !rel.as_os_str().is_empty() => {
                        !self.is_pruned_dir(rel)
                    }
                    _ => true,
                }
            });

        for entry in walker {
            let entry = entry.map_err(walk_error)?;
            if !entry.path().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            if self.is_included(rel) {
                files.push(rel.to_path_buf());
            }
        }

        Ok(files)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// `<staging>/META-INF/resources/webjars/<name>/<version>`.
    pub destination: PathBuf,
    pub files: usize,
    pub bytes: u64,
}

/// Copy the selected sources into a fresh staging tree.
///
/// A leftover staging root from an earlier run is removed first. Zero
/// matching files is not an error: the destination is created empty.
pub fn stage_files(
    config: &WebjarConfig,
    identity: &ArtifactIdentity,
    reporter: &mut dyn Reporter,
) -> Result<StageReport> {
    let selector = SourceSelector::from_patterns(&config.artifact_src)?;

    if clean_staging(&config.staging_dir)? {
        reporter.warn(&format!(
            "removed stale staging directory {}",
            config.staging_dir.display()
        ));
    }

    let destination = config.webjar_dir(identity);
    fs::create_dir_all(&destination).map_err(|e| WebjarError::io(&destination, e))?;

    let files = selector.collect(&config.work_dir, &tool_files(config))?;
    if files.is_empty() {
        reporter.warn(&format!(
            "source patterns {:?} matched no files; staging an empty webjar",
            config.artifact_src
        ));
    }

    let mut bytes = 0u64;
    for rel in &files {
        let from = config.work_dir.join(rel);
        let to = destination.join(rel);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| WebjarError::io(parent, e))?;
        }
        bytes += fs::copy(&from, &to).map_err(|e| WebjarError::io(&to, e))?;
    }

    reporter.info(&format!(
        "staged {} file(s) into {}",
        files.len(),
        destination.display()
    ));

    Ok(StageReport {
        destination,
        files: files.len(),
        bytes,
    })
}

/// Paths under the work dir that belong to this tool, not the webjar.
fn tool_files(config: &WebjarConfig) -> Vec<PathBuf> {
    let mut skip = vec![
        config.staging_dir.clone(),
        config.work_dir.join(CONFIG_FILE),
    ];
    skip.extend(config.settings_template.clone());
    skip
}

/// Remove the staging root. Returns whether anything was removed; a missing
/// directory is not an error.
pub fn clean_staging(dir: &Path) -> Result<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(WebjarError::io(dir, e)),
    }
}

fn walk_error(err: walkdir::Error) -> WebjarError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    let io_err = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop while walking sources"));
    WebjarError::io(path, io_err)
}

fn is_hidden(rel: &Path) -> bool {
    rel.components().any(|c| match c {
        Component::Normal(s) => s.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

fn names_hidden(pattern: &str) -> bool {
    pattern
        .split('/')
        .any(|seg| seg.starts_with('.') && seg != "." && seg != "..")
}

fn to_slash(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
