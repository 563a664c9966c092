use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use webjar::config::{WebjarConfig, WebjarFileConfig, WebjarOptions};
use webjar::packager::MavenPackager;
use webjar::pipeline::{Pipeline, Reporter, Services, run_pipeline};
use webjar::probe::{Reachability, RepositoryProbe};
use webjar::prompt::StdinPrompt;
use webjar::settings::{self, MavenSettings};
use webjar::types::{ArtifactIdentity, PipelineReport};

mod progress;

use progress::ProgressReporter;

#[derive(Parser, Debug)]
#[command(name = "webjar", version)]
#[command(about = "Stage web assets as a Maven webjar, then install or publish it")]
struct Cli {
    /// Project directory containing package.json
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Config file (default: <work-dir>/webjar.toml, if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Package metadata file, relative to the work dir.
    #[arg(long)]
    package_json: Option<PathBuf>,

    /// Artifact name (default: package.json name)
    #[arg(long)]
    artifact_name: Option<String>,

    /// Prefix joined to the name to form the artifactId.
    #[arg(long)]
    artifact_id_prefix: Option<String>,

    #[arg(long)]
    group_id: Option<String>,

    /// Source glob (repeatable). Prefix with `!` to exclude.
    #[arg(long = "src", allow_hyphen_values = true)]
    sources: Vec<String>,

    /// Staging directory, relative to the work dir (default: maven-dist)
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// settings.xml template used by `init` and `install`.
    #[arg(long)]
    settings_template: Option<PathBuf>,

    /// Maven executable (default: $WEBJAR_MVN_BIN, then mvn)
    #[arg(long)]
    mvn: Option<String>,

    /// Kill a Maven invocation after this long (e.g. 10m)
    #[arg(long)]
    maven_timeout: Option<String>,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Never draw progress bars.
    #[arg(long)]
    no_progress: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set the local repository, then install a snapshot into it.
    Install,
    /// Publish a release to the release repositories.
    Publish,
    /// Publish a timestamped snapshot to the snapshot repositories.
    PublishSnapshot,
    /// Prompt for a local repository path and write ~/.m2/settings.xml.
    Init,
    /// Copy sources into the staging directory only.
    Stage {
        #[arg(long)]
        snapshot: bool,
    },
    /// Remove the staging directory.
    Clean,
    /// Print the resolved artifact coordinates.
    Identity {
        #[arg(long)]
        snapshot: bool,
    },
    /// Print configuration, tool, and repository diagnostics.
    Doctor {
        /// Skip repository reachability checks.
        #[arg(long)]
        offline: bool,
    },
}

struct CliReporter {
    progress: Option<ProgressReporter>,
}

impl CliReporter {
    fn plain() -> Self {
        Self { progress: None }
    }

    fn with_progress(total_steps: usize, enabled: bool) -> Self {
        let progress = if enabled {
            ProgressReporter::new(total_steps)
        } else {
            ProgressReporter::silent(total_steps)
        };
        Self {
            progress: Some(progress),
        }
    }

    fn emit(&self, line: &str) {
        match &self.progress {
            Some(p) => p.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn finish(self, ok: bool) {
        if let Some(p) = self.progress {
            if ok { p.finish() } else { p.abandon() }
        }
    }
}

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        self.emit(&format!("[info] {msg}"));
    }

    fn warn(&mut self, msg: &str) {
        self.emit(&format!("[warn] {msg}"));
    }

    fn error(&mut self, msg: &str) {
        self.emit(&format!("[error] {msg}"));
    }

    fn step(&mut self, index: usize, total: usize, name: &str) {
        match &mut self.progress {
            Some(p) => p.set_step(index, name),
            None => eprintln!("[{index}/{total}] {name}"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match &cli.cmd {
        Commands::Install => run(&Pipeline::local_install(), &config, &cli)?,
        Commands::Publish => run(&Pipeline::publish_release(), &config, &cli)?,
        Commands::PublishSnapshot => run(&Pipeline::publish_snapshot(), &config, &cli)?,
        Commands::Init => run(&Pipeline::init(), &config, &cli)?,
        Commands::Stage { snapshot } => run(&Pipeline::stage(*snapshot), &config, &cli)?,
        Commands::Clean => run(&Pipeline::clean(), &config, &cli)?,
        Commands::Identity { snapshot } => {
            let identity = config
                .identity(*snapshot)
                .context("failed to resolve artifact identity")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&identity)?);
            } else {
                print_identity(&config, &identity);
            }
        }
        Commands::Doctor { offline } => {
            run_doctor(&config, *offline, &mut CliReporter::plain())?;
        }
    }

    Ok(())
}

/// Defaults, then `webjar.toml`, then flags.
fn resolve_config(cli: &Cli) -> Result<WebjarConfig> {
    let work_dir = if cli.work_dir.is_absolute() {
        cli.work_dir.clone()
    } else {
        env::current_dir()
            .context("failed to read the current directory")?
            .join(&cli.work_dir)
    };

    let file = match &cli.config {
        Some(path) => Some(WebjarFileConfig::load_from_file(path)?),
        None => WebjarFileConfig::load_from_dir(&work_dir)?,
    };

    let flags = WebjarOptions {
        artifact_id_prefix: cli.artifact_id_prefix.clone(),
        artifact_name: cli.artifact_name.clone(),
        group_id: cli.group_id.clone(),
        artifact_src: (!cli.sources.is_empty()).then(|| cli.sources.clone()),
        package_json_path: cli.package_json.clone(),
        repositories: None,
        staging_dir: cli.staging_dir.clone(),
        settings_template: cli.settings_template.clone(),
        maven_command: cli.mvn.clone(),
        maven_timeout: cli
            .maven_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()?,
        output_lines: None,
    };

    let options = match file {
        Some(file) => file.into_options().merge(flags),
        None => flags,
    };
    Ok(options.resolve(&work_dir))
}

fn parse_duration(s: &str) -> Result<Duration> {
    humantime::parse_duration(s).with_context(|| format!("invalid duration: {s}"))
}

fn run(pipeline: &Pipeline, config: &WebjarConfig, cli: &Cli) -> Result<()> {
    let packager = MavenPackager::from_config(config);
    let settings = MavenSettings::from_config(config);
    let mut prompt = StdinPrompt::stdin();
    let mut services = Services {
        packager: &packager,
        prompt: &mut prompt,
        settings: &settings,
    };
    let mut reporter = CliReporter::with_progress(pipeline.steps().len(), !cli.no_progress);

    let result = run_pipeline(pipeline, config, &mut services, &mut reporter);
    reporter.finish(result.is_ok());
    let report = result.with_context(|| format!("{} failed", pipeline.name()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!("pipeline: {}", report.pipeline);
    if let Some(id) = &report.identity {
        println!("artifact: {}:{}:{}", id.group_id, id.artifact_id, id.version);
        println!("final_name: {}", id.final_name);
    }
    if let Some(path) = &report.local_repository {
        println!("local_repository: {path}");
    }
    println!();

    for (idx, step) in report.steps.iter().enumerate() {
        println!("{:>3}. {} ({}ms)", idx + 1, step.step, step.duration_ms);
    }
}

fn print_identity(config: &WebjarConfig, identity: &ArtifactIdentity) {
    println!("name: {}", identity.name);
    println!("version: {}", identity.version);
    println!("final_name: {}", identity.final_name);
    println!("artifact_id: {}", identity.artifact_id);
    println!("group_id: {}", identity.group_id);
    println!("staging: {}", config.webjar_dir(identity).display());
}

fn run_doctor(config: &WebjarConfig, offline: bool, reporter: &mut dyn Reporter) -> Result<()> {
    println!("work_dir: {}", config.work_dir.display());
    print_path("package_json", &config.package_json_path, reporter);
    println!("staging_dir: {}", config.staging_dir.display());
    match &config.settings_template {
        Some(path) => print_path("settings_template", path, reporter),
        None => println!("settings_template: <bundled>"),
    }
    match settings::user_settings_path() {
        Ok(path) => println!("user_settings: {}", path.display()),
        Err(e) => reporter.warn(&e.to_string()),
    }
    println!("sources: {}", config.artifact_src.join(" "));
    println!();

    print_cmd_version(&config.maven_program(), reporter);

    if offline {
        return Ok(());
    }

    println!();
    let probe = RepositoryProbe::new()?;
    for (channel, repos) in [
        ("releases", &config.repositories.releases),
        ("snapshots", &config.repositories.snapshots),
    ] {
        for repo in repos {
            let reach = probe.check(repo);
            match &reach {
                Reachability::Reachable { status } => {
                    println!("{channel} {} ({}): reachable (HTTP {status})", repo.id, repo.url);
                }
                Reachability::Unreachable { reason } => {
                    println!("{channel} {} ({}): unreachable", repo.id, repo.url);
                    reporter.warn(&format!("{}: {reason}", repo.id));
                }
            }
        }
    }

    Ok(())
}

fn print_path(label: &str, path: &Path, reporter: &mut dyn Reporter) {
    println!("{label}: {}", path.display());
    if !path.exists() {
        reporter.warn(&format!("{label} {} does not exist", path.display()));
    }
}

fn print_cmd_version(cmd: &str, reporter: &mut dyn Reporter) {
    let out = Command::new(cmd).arg("--version").output();
    match out {
        Ok(o) if o.status.success() => {
            let s = String::from_utf8_lossy(&o.stdout);
            let first = s.lines().next().unwrap_or_default().trim();
            println!("maven: {first}");
        }
        Ok(o) => {
            reporter.warn(&format!(
                "{cmd} --version failed: {}",
                String::from_utf8_lossy(&o.stderr).trim()
            ));
        }
        Err(e) => {
            reporter.warn(&format!("unable to run {cmd} --version: {e}"));
        }
    }
}
