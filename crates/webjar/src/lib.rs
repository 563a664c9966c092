//! # webjar
//!
//! Package a front-end project as a Maven webjar and install or publish it.
//!
//! A webjar is a jar whose static assets live under
//! `META-INF/resources/webjars/<name>/<version>/`. This crate selects the
//! project's sources with glob patterns, stages them under that layout, and
//! hands the staged tree to Maven for a local install or a remote deploy.
//!
//! ## Pipelines
//!
//! | Pipeline           | Steps                                                    |
//! |--------------------|----------------------------------------------------------|
//! | `local-install`    | init-local-repository, stage-files, install, clean-staging |
//! | `publish-release`  | stage-files, deploy, clean-staging                       |
//! | `publish-snapshot` | stage-files, deploy, clean-staging                       |
//! | `init`             | init-local-repository                                    |
//!
//! Steps run strictly in order and the first failure aborts the run with
//! the step's own [`error::WebjarError`]. Snapshot runs compute one
//! `<version>-SNAPSHOT-<epoch millis>` version and reuse it for every step.
//!
//! ## Example
//!
//! ```ignore
//! use std::path::Path;
//! use webjar::config::WebjarOptions;
//! use webjar::packager::MavenPackager;
//! use webjar::pipeline::{Pipeline, Services, run_pipeline};
//! use webjar::prompt::StdinPrompt;
//! use webjar::settings::MavenSettings;
//!
//! let config = WebjarOptions::default().resolve(Path::new("."));
//! let packager = MavenPackager::from_config(&config);
//! let settings = MavenSettings::from_config(&config);
//! let mut prompt = StdinPrompt::stdin();
//! let mut services = Services { packager: &packager, prompt: &mut prompt, settings: &settings };
//! let report = run_pipeline(&Pipeline::publish_release(), &config, &mut services, &mut reporter)?;
//! ```

/// Jar assembly from a staged tree.
pub mod archive;

/// Option layering, `webjar.toml` loading, and artifact identity.
pub mod config;

pub mod error;

/// `package.json` name/version lookup.
pub mod metadata;

/// Maven install/deploy behind the `Packager` trait.
pub mod packager;

/// Pipeline definitions and the step sequencer.
pub mod pipeline;

/// Repository reachability checks.
pub mod probe;

pub(crate) mod process;

/// Operator input behind the `Prompt` trait.
pub mod prompt;

/// `settings.xml` patching behind the `SettingsStore` trait.
pub mod settings;

/// Source selection and the staging tree.
pub mod staging;

/// Domain types shared across modules.
pub mod types;
