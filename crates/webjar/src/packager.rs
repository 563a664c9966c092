//! Packaging and deployment capability.
//!
//! The pipeline only needs success or failure from these calls. The real
//! implementation zips the staging tree and hands the archive to Maven
//! (`install:install-file` / `deploy:deploy-file`), which owns the local
//! repository layout, POM generation, checksums, and credentials.

use std::path::PathBuf;
use std::time::Duration;

use crate::archive::{ArchiveInfo, build_archive};
use crate::config::WebjarConfig;
use crate::error::{Result, WebjarError};
use crate::pipeline::Reporter;
use crate::process::{self, CommandOutput};
use crate::types::{PackageRequest, Repository};

pub trait Packager {
    /// Package and install into the local repository cache.
    fn install(&self, request: &PackageRequest, reporter: &mut dyn Reporter) -> Result<()>;

    /// Package and publish to every repository, in order. The first failing
    /// endpoint aborts the call.
    fn deploy(
        &self,
        request: &PackageRequest,
        repositories: &[Repository],
        reporter: &mut dyn Reporter,
    ) -> Result<()>;
}

/// [`Packager`] backed by the `mvn` command line.
#[derive(Debug, Clone)]
pub struct MavenPackager {
    program: String,
    working_dir: PathBuf,
    timeout: Option<Duration>,
    output_lines: usize,
}

impl MavenPackager {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            timeout: None,
            output_lines: crate::config::DEFAULT_OUTPUT_LINES,
        }
    }

    pub fn from_config(config: &WebjarConfig) -> Self {
        Self::new(config.maven_program(), config.work_dir.clone())
            .with_timeout(config.maven_timeout)
            .with_output_lines(config.output_lines)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output_lines(mut self, lines: usize) -> Self {
        self.output_lines = lines.max(1);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn archive(&self, request: &PackageRequest, reporter: &mut dyn Reporter) -> Result<ArchiveInfo> {
        let info = build_archive(&request.build_dir, &request.archive_file_name())?;
        reporter.info(&format!(
            "built {} ({} entries, {} bytes, sha256 {})",
            info.path.display(),
            info.entries,
            info.size,
            info.sha256
        ));
        Ok(info)
    }

    fn run(&self, args: &[String]) -> Result<CommandOutput> {
        process::run_command_with_timeout(&self.program, args, &self.working_dir, self.timeout)
            .map_err(|e| {
                WebjarError::packaging(format!(
                    "failed to execute {}: {e}; is Maven installed?",
                    self.program
                ))
            })
    }
}

/// Arguments shared by `install-file` and `deploy-file`.
pub fn coordinate_args(request: &PackageRequest, archive: &ArchiveInfo) -> Vec<String> {
    vec![
        format!("-Dfile={}", archive.path.display()),
        format!("-DgroupId={}", request.group_id),
        format!("-DartifactId={}", request.artifact_id),
        format!("-Dversion={}", request.version),
        format!("-Dpackaging={}", request.packaging),
        "-DgeneratePom=true".to_string(),
    ]
}

pub fn install_args(request: &PackageRequest, archive: &ArchiveInfo) -> Vec<String> {
    let mut args = vec!["-B".to_string(), "install:install-file".to_string()];
    args.extend(coordinate_args(request, archive));
    args
}

pub fn deploy_args(
    request: &PackageRequest,
    archive: &ArchiveInfo,
    repository: &Repository,
) -> Vec<String> {
    let mut args = vec!["-B".to_string(), "deploy:deploy-file".to_string()];
    args.extend(coordinate_args(request, archive));
    args.push(format!("-Durl={}", repository.url));
    args.push(format!("-DrepositoryId={}", repository.id));
    args
}

impl Packager for MavenPackager {
    fn install(&self, request: &PackageRequest, reporter: &mut dyn Reporter) -> Result<()> {
        let archive = self.archive(request, reporter)?;

        reporter.info(&format!(
            "installing {}:{}:{} into the local repository...",
            request.group_id, request.artifact_id, request.version
        ));
        let out = self.run(&install_args(request, &archive))?;
        if !out.success() {
            return Err(WebjarError::packaging(format!(
                "mvn install:install-file failed (exit code {}{}):\n{}",
                out.exit_code,
                if out.timed_out { ", timed out" } else { "" },
                out.tail(self.output_lines)
            )));
        }

        reporter.info(&format!(
            "installed {} in {}",
            request.final_name,
            humantime::format_duration(Duration::from_millis(out.duration.as_millis() as u64))
        ));
        Ok(())
    }

    fn deploy(
        &self,
        request: &PackageRequest,
        repositories: &[Repository],
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        if repositories.is_empty() {
            return Err(WebjarError::config(
                "no repositories configured for this publish channel",
            ));
        }

        let archive = self.archive(request, reporter)?;

        for repo in repositories {
            reporter.info(&format!(
                "deploying {}:{}:{} to {} ({})...",
                request.group_id, request.artifact_id, request.version, repo.id, repo.url
            ));
            let out = self.run(&deploy_args(request, &archive, repo))?;
            if !out.success() {
                return Err(WebjarError::network(
                    &repo.id,
                    format!(
                        "mvn deploy:deploy-file failed (exit code {}{}):\n{}",
                        out.exit_code,
                        if out.timed_out { ", timed out" } else { "" },
                        out.tail(self.output_lines)
                    ),
                ));
            }
            reporter.info(&format!("deployed {} to {}", request.final_name, repo.id));
        }

        Ok(())
    }
}
