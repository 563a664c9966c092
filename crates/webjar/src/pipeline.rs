//! Pipeline definitions and the sequencer that runs them.
//!
//! A [`Pipeline`] is an ordered list of [`Step`]s. [`run_pipeline`] runs
//! them one at a time and stops at the first error, which is returned
//! unchanged. Nothing is rolled back: a failed install or deploy leaves the
//! staging directory on disk for inspection or the next run.
//!
//! Snapshot identity is resolved once per run and shared by every step, so
//! the staged directory name and the published version always agree.

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use crate::config::WebjarConfig;
use crate::error::Result;
use crate::packager::Packager;
use crate::prompt::{Prompt, local_repository_prompt};
use crate::settings::SettingsStore;
use crate::staging;
use crate::types::{ArtifactIdentity, PackageRequest, PipelineReport, StepRecord};

pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);

    /// Called before step `index` (1-based) of `total` starts.
    fn step(&mut self, index: usize, total: usize, name: &str) {
        self.info(&format!("[{index}/{total}] {name}"));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// Prompt for a local repository path and write it into settings.xml.
    InitLocalRepository,
    StageFiles,
    Install,
    Deploy,
    CleanStaging,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::InitLocalRepository => "init-local-repository",
            Step::StageFiles => "stage-files",
            Step::Install => "install",
            Step::Deploy => "deploy",
            Step::CleanStaging => "clean-staging",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    name: &'static str,
    snapshot: bool,
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(name: &'static str, snapshot: bool, steps: Vec<Step>) -> Self {
        Self {
            name,
            snapshot,
            steps,
        }
    }

    /// Point settings.xml at a local repository, then install a snapshot there.
    pub fn local_install() -> Self {
        Self::new(
            "local-install",
            true,
            vec![
                Step::InitLocalRepository,
                Step::StageFiles,
                Step::Install,
                Step::CleanStaging,
            ],
        )
    }

    pub fn publish_release() -> Self {
        Self::new(
            "publish-release",
            false,
            vec![Step::StageFiles, Step::Deploy, Step::CleanStaging],
        )
    }

    pub fn publish_snapshot() -> Self {
        Self::new(
            "publish-snapshot",
            true,
            vec![Step::StageFiles, Step::Deploy, Step::CleanStaging],
        )
    }

    pub fn init() -> Self {
        Self::new("init", false, vec![Step::InitLocalRepository])
    }

    pub fn stage(snapshot: bool) -> Self {
        Self::new("stage", snapshot, vec![Step::StageFiles])
    }

    pub fn clean() -> Self {
        Self::new("clean", false, vec![Step::CleanStaging])
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn snapshot(&self) -> bool {
        self.snapshot
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// External capabilities a pipeline drives.
pub struct Services<'a> {
    pub packager: &'a dyn Packager,
    pub prompt: &'a mut dyn Prompt,
    pub settings: &'a dyn SettingsStore,
}

/// State handed from step to step within one run.
#[derive(Debug, Default)]
struct RunContext {
    identity: Option<ArtifactIdentity>,
    local_repository: Option<String>,
}

impl RunContext {
    fn identity(&mut self, config: &WebjarConfig, snapshot: bool) -> Result<ArtifactIdentity> {
        if let Some(id) = &self.identity {
            return Ok(id.clone());
        }
        let id = config.identity(snapshot)?;
        self.identity = Some(id.clone());
        Ok(id)
    }
}

pub fn package_request(config: &WebjarConfig, identity: &ArtifactIdentity) -> PackageRequest {
    PackageRequest {
        artifact_id: identity.artifact_id.clone(),
        build_dir: config.staging_dir.clone(),
        final_name: identity.final_name.clone(),
        group_id: identity.group_id.clone(),
        packaging: config.packaging().to_string(),
        version: identity.version.clone(),
    }
}

/// Run every step of `pipeline` in order, aborting on the first failure.
pub fn run_pipeline(
    pipeline: &Pipeline,
    config: &WebjarConfig,
    services: &mut Services<'_>,
    reporter: &mut dyn Reporter,
) -> Result<PipelineReport> {
    let started_at = Utc::now();
    let mut ctx = RunContext::default();
    let mut records = Vec::with_capacity(pipeline.steps.len());
    let total = pipeline.steps.len();

    for (idx, step) in pipeline.steps.iter().enumerate() {
        reporter.step(idx + 1, total, step.name());
        let start = Instant::now();

        if let Err(err) = run_step(*step, pipeline, config, services, &mut ctx, reporter) {
            reporter.error(&format!(
                "{step} failed ({}): {err}; aborting {}",
                err.kind(),
                pipeline.name
            ));
            if matches!(step, Step::Install | Step::Deploy) && config.staging_dir.exists() {
                reporter.warn(&format!(
                    "staging directory left at {}; run `webjar clean` to remove it",
                    config.staging_dir.display()
                ));
            }
            return Err(err);
        }

        records.push(StepRecord {
            step: step.name().to_string(),
            duration_ms: start.elapsed().as_millis(),
        });
    }

    Ok(PipelineReport {
        pipeline: pipeline.name.to_string(),
        started_at,
        finished_at: Utc::now(),
        identity: ctx.identity,
        local_repository: ctx.local_repository,
        steps: records,
    })
}

fn run_step(
    step: Step,
    pipeline: &Pipeline,
    config: &WebjarConfig,
    services: &mut Services<'_>,
    ctx: &mut RunContext,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    match step {
        Step::InitLocalRepository => {
            let answer = services.prompt.input(&local_repository_prompt())?;
            let written = services.settings.write_local_repository(&answer)?;
            reporter.info(&format!(
                "set localRepository to {answer} in {}",
                written.display()
            ));
            ctx.local_repository = Some(answer);
        }
        Step::StageFiles => {
            let id = ctx.identity(config, pipeline.snapshot)?;
            staging::stage_files(config, &id, reporter)?;
        }
        Step::Install => {
            let id = ctx.identity(config, pipeline.snapshot)?;
            services
                .packager
                .install(&package_request(config, &id), reporter)?;
        }
        Step::Deploy => {
            let id = ctx.identity(config, pipeline.snapshot)?;
            let repositories = config.repositories.for_channel(pipeline.snapshot);
            services
                .packager
                .deploy(&package_request(config, &id), repositories, reporter)?;
        }
        Step::CleanStaging => {
            if staging::clean_staging(&config.staging_dir)? {
                reporter.info(&format!("removed {}", config.staging_dir.display()));
            } else {
                reporter.info(&format!(
                    "{} does not exist; nothing to clean",
                    config.staging_dir.display()
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::tempdir;

    use super::*;
    use crate::config::WebjarOptions;
    use crate::error::WebjarError;
    use crate::types::{PromptDescriptor, Repository};

    #[derive(Default)]
    struct CollectingReporter {
        infos: Vec<String>,
        warns: Vec<String>,
        errors: Vec<String>,
        steps: Vec<String>,
    }

    impl Reporter for CollectingReporter {
        fn info(&mut self, msg: &str) {
            self.infos.push(msg.to_string());
        }

        fn warn(&mut self, msg: &str) {
            self.warns.push(msg.to_string());
        }

        fn error(&mut self, msg: &str) {
            self.errors.push(msg.to_string());
        }

        fn step(&mut self, _index: usize, _total: usize, name: &str) {
            self.steps.push(name.to_string());
        }
    }

    #[derive(Debug, Clone)]
    struct PackagerCall {
        kind: &'static str,
        request: PackageRequest,
        repositories: Vec<Repository>,
        /// Whether the staged webjar directory for `request.version` existed at call time.
        staged: bool,
    }

    #[derive(Default)]
    struct FakePackager {
        calls: RefCell<Vec<PackagerCall>>,
        fail_deploy: bool,
    }

    impl FakePackager {
        fn failing_deploy() -> Self {
            Self {
                fail_deploy: true,
                ..Default::default()
            }
        }

        fn record(&self, kind: &'static str, request: &PackageRequest, repositories: &[Repository]) {
            let staged = request
                .build_dir
                .join("META-INF/resources/webjars/foo")
                .join(&request.version)
                .is_dir();
            self.calls.borrow_mut().push(PackagerCall {
                kind,
                request: request.clone(),
                repositories: repositories.to_vec(),
                staged,
            });
        }
    }

    impl Packager for FakePackager {
        fn install(&self, request: &PackageRequest, _reporter: &mut dyn Reporter) -> Result<()> {
            self.record("install", request, &[]);
            Ok(())
        }

        fn deploy(
            &self,
            request: &PackageRequest,
            repositories: &[Repository],
            _reporter: &mut dyn Reporter,
        ) -> Result<()> {
            self.record("deploy", request, repositories);
            if self.fail_deploy {
                return Err(WebjarError::network(
                    &repositories[0].id,
                    "connection refused",
                ));
            }
            Ok(())
        }
    }

    struct FakePrompt {
        answer: Option<String>,
        asked: Vec<PromptDescriptor>,
    }

    impl FakePrompt {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                asked: Vec::new(),
            }
        }
    }

    impl Prompt for FakePrompt {
        fn input(&mut self, descriptor: &PromptDescriptor) -> Result<String> {
            self.asked.push(descriptor.clone());
            self.answer
                .clone()
                .ok_or_else(|| WebjarError::config("no answer"))
        }
    }

    #[derive(Default)]
    struct FakeSettings {
        written: RefCell<Vec<String>>,
        missing_template: bool,
    }

    impl SettingsStore for FakeSettings {
        fn write_local_repository(&self, local_repository: &str) -> Result<PathBuf> {
            if self.missing_template {
                return Err(WebjarError::config("settings template settings.xml is missing"));
            }
            self.written.borrow_mut().push(local_repository.to_string());
            Ok(PathBuf::from("/home/test/.m2/settings.xml"))
        }
    }

    fn project(root: &Path) -> WebjarConfig {
        fs::write(
            root.join("package.json"),
            r#"{"name": "foo", "version": "1.2.3"}"#,
        )
        .expect("write package.json");
        fs::create_dir_all(root.join("css")).expect("mkdir");
        fs::write(root.join("index.js"), "export default 1;").expect("write");
        fs::write(root.join("css/main.css"), "body{}").expect("write");
        WebjarOptions::default().resolve(root)
    }

    fn is_snapshot_of(version: &str, raw: &str) -> bool {
        version
            .strip_prefix(&format!("{raw}-SNAPSHOT-"))
            .is_some_and(|ts| !ts.is_empty() && ts.chars().all(|c| c.is_ascii_digit()))
    }

    #[test]
    fn pipelines_have_fixed_step_order() {
        use Step::*;
        assert_eq!(
            Pipeline::local_install().steps(),
            &[InitLocalRepository, StageFiles, Install, CleanStaging]
        );
        assert_eq!(
            Pipeline::publish_release().steps(),
            &[StageFiles, Deploy, CleanStaging]
        );
        assert_eq!(
            Pipeline::publish_snapshot().steps(),
            &[StageFiles, Deploy, CleanStaging]
        );
        assert_eq!(Pipeline::init().steps(), &[InitLocalRepository]);
        assert!(Pipeline::local_install().snapshot());
        assert!(!Pipeline::publish_release().snapshot());
        assert!(Pipeline::publish_snapshot().snapshot());
    }

    #[test]
    fn publish_release_stages_deploys_and_cleans() {
        let td = tempdir().expect("tempdir");
        let config = project(td.path());
        let packager = FakePackager::default();
        let mut prompt = FakePrompt::answering("/unused");
        let settings = FakeSettings::default();
        let mut services = Services {
            packager: &packager,
            prompt: &mut prompt,
            settings: &settings,
        };
        let mut reporter = CollectingReporter::default();

        let report = run_pipeline(
            &Pipeline::publish_release(),
            &config,
            &mut services,
            &mut reporter,
        )
        .expect("pipeline");

        let calls = packager.calls.borrow();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.kind, "deploy");
        assert!(call.staged, "staged tree must exist when deploy runs");
        assert_eq!(call.request.final_name, "foo-1.2.3");
        assert_eq!(call.request.artifact_id, "com.liferay.webjars.foo");
        assert_eq!(call.request.group_id, "com.liferay.webjars");
        assert_eq!(call.request.version, "1.2.3");
        assert_eq!(call.request.packaging, "jar");
        assert_eq!(call.request.build_dir, td.path().join("maven-dist"));
        assert_eq!(call.repositories, config.repositories.releases);

        assert!(!td.path().join("maven-dist").exists());
        assert!(prompt.asked.is_empty());
        assert_eq!(reporter.steps, vec!["stage-files", "deploy", "clean-staging"]);
        assert_eq!(report.pipeline, "publish-release");
        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.identity.expect("identity").version, "1.2.3");
    }

    #[test]
    fn local_install_uses_one_snapshot_version_throughout() {
        let td = tempdir().expect("tempdir");
        let config = project(td.path());
        let packager = FakePackager::default();
        let mut prompt = FakePrompt::answering("/opt/webjars");
        let settings = FakeSettings::default();
        let mut services = Services {
            packager: &packager,
            prompt: &mut prompt,
            settings: &settings,
        };
        let mut reporter = CollectingReporter::default();

        let report = run_pipeline(
            &Pipeline::local_install(),
            &config,
            &mut services,
            &mut reporter,
        )
        .expect("pipeline");

        let calls = packager.calls.borrow();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.kind, "install");
        assert!(is_snapshot_of(&call.request.version, "1.2.3"));
        assert!(
            call.staged,
            "staging path must use the same version as the install call"
        );
        assert_eq!(
            call.request.final_name,
            format!("foo-{}", call.request.version)
        );

        let identity = report.identity.expect("identity");
        assert_eq!(identity.version, call.request.version);
        assert_eq!(report.local_repository.as_deref(), Some("/opt/webjars"));
        assert_eq!(*settings.written.borrow(), vec!["/opt/webjars".to_string()]);
        assert_eq!(prompt.asked.len(), 1);
        assert!(!td.path().join("maven-dist").exists());
        assert_eq!(
            reporter.steps,
            vec!["init-local-repository", "stage-files", "install", "clean-staging"]
        );
    }

    #[test]
    fn failed_deploy_aborts_before_cleanup() {
        let td = tempdir().expect("tempdir");
        let config = project(td.path());
        let packager = FakePackager::failing_deploy();
        let mut prompt = FakePrompt::answering("/unused");
        let settings = FakeSettings::default();
        let mut services = Services {
            packager: &packager,
            prompt: &mut prompt,
            settings: &settings,
        };
        let mut reporter = CollectingReporter::default();

        let err = run_pipeline(
            &Pipeline::publish_snapshot(),
            &config,
            &mut services,
            &mut reporter,
        )
        .unwrap_err();

        match err {
            WebjarError::Network { repository, message } => {
                assert_eq!(repository, "liferay-public-snapshots");
                assert_eq!(message, "connection refused");
            }
            other => panic!("expected the deploy error unchanged, got {other:?}"),
        }
        assert!(td.path().join("maven-dist").is_dir());
        assert_eq!(reporter.steps, vec!["stage-files", "deploy"]);
        assert!(reporter.errors[0].starts_with("deploy failed (network)"));
        assert!(reporter.warns.iter().any(|w| w.contains("webjar clean")));
    }

    #[test]
    fn publish_snapshot_uses_snapshot_repositories() {
        let td = tempdir().expect("tempdir");
        let mut config = project(td.path());
        config.repositories.snapshots = vec![Repository::new("internal", "https://nexus.example.com/")];
        let packager = FakePackager::default();
        let mut prompt = FakePrompt::answering("/unused");
        let settings = FakeSettings::default();
        let mut services = Services {
            packager: &packager,
            prompt: &mut prompt,
            settings: &settings,
        };

        run_pipeline(
            &Pipeline::publish_snapshot(),
            &config,
            &mut services,
            &mut CollectingReporter::default(),
        )
        .expect("pipeline");

        let calls = packager.calls.borrow();
        assert_eq!(calls[0].repositories[0].id, "internal");
        assert!(is_snapshot_of(&calls[0].request.version, "1.2.3"));
        assert!(calls[0].staged);
    }

    #[test]
    fn empty_source_selection_still_publishes() {
        let td = tempdir().expect("tempdir");
        let mut config = project(td.path());
        config.artifact_src = vec!["dist/**".to_string()];
        let packager = FakePackager::default();
        let mut prompt = FakePrompt::answering("/unused");
        let settings = FakeSettings::default();
        let mut services = Services {
            packager: &packager,
            prompt: &mut prompt,
            settings: &settings,
        };
        let mut reporter = CollectingReporter::default();

        let report = run_pipeline(
            &Pipeline::publish_release(),
            &config,
            &mut services,
            &mut reporter,
        )
        .expect("pipeline");

        assert_eq!(report.steps.len(), 3);
        assert!(packager.calls.borrow()[0].staged);
        assert!(reporter.warns.iter().any(|w| w.contains("matched no files")));
    }

    #[test]
    fn missing_metadata_fails_at_staging_without_packaging() {
        let td = tempdir().expect("tempdir");
        let config = WebjarOptions::default().resolve(td.path());
        let packager = FakePackager::default();
        let mut prompt = FakePrompt::answering("/unused");
        let settings = FakeSettings::default();
        let mut services = Services {
            packager: &packager,
            prompt: &mut prompt,
            settings: &settings,
        };
        let mut reporter = CollectingReporter::default();

        let err = run_pipeline(
            &Pipeline::publish_release(),
            &config,
            &mut services,
            &mut reporter,
        )
        .unwrap_err();

        assert!(matches!(err, WebjarError::Configuration(_)));
        assert!(packager.calls.borrow().is_empty());
        assert_eq!(reporter.steps, vec!["stage-files"]);
    }

    #[test]
    fn init_failure_stops_local_install_before_staging() {
        let td = tempdir().expect("tempdir");
        let config = project(td.path());
        let packager = FakePackager::default();
        let mut prompt = FakePrompt::answering("/opt/webjars");
        let settings = FakeSettings {
            missing_template: true,
            ..Default::default()
        };
        let mut services = Services {
            packager: &packager,
            prompt: &mut prompt,
            settings: &settings,
        };

        let err = run_pipeline(
            &Pipeline::local_install(),
            &config,
            &mut services,
            &mut CollectingReporter::default(),
        )
        .unwrap_err();

        assert!(matches!(err, WebjarError::Configuration(_)));
        assert!(!td.path().join("maven-dist").exists());
        assert!(packager.calls.borrow().is_empty());
    }

    #[test]
    fn clean_on_missing_staging_succeeds() {
        let td = tempdir().expect("tempdir");
        let config = WebjarOptions::default().resolve(td.path());
        let packager = FakePackager::default();
        let mut prompt = FakePrompt::answering("/unused");
        let settings = FakeSettings::default();
        let mut services = Services {
            packager: &packager,
            prompt: &mut prompt,
            settings: &settings,
        };
        let mut reporter = CollectingReporter::default();

        let report = run_pipeline(&Pipeline::clean(), &config, &mut services, &mut reporter)
            .expect("clean");
        assert_eq!(report.steps.len(), 1);
        assert!(report.identity.is_none());
        assert!(reporter.infos.iter().any(|m| m.contains("nothing to clean")));
    }
}
