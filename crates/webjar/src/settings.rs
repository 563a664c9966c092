//! Maven `settings.xml` initialization.
//!
//! Only `<localRepository>` is touched; the rest of the template is copied
//! through byte for byte.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use regex::{NoExpand, Regex};

use crate::config::WebjarConfig;
use crate::error::{Result, WebjarError};

/// Template used when no `settings.template` is configured.
pub const BUNDLED_TEMPLATE: &str = include_str!("../assets/settings.xml");

pub trait SettingsStore {
    /// Write settings with `<localRepository>` set to `local_repository`.
    /// Returns the file that was written.
    fn write_local_repository(&self, local_repository: &str) -> Result<PathBuf>;
}

/// Patches a template and writes it to the per-user Maven directory.
#[derive(Debug, Clone, Default)]
pub struct MavenSettings {
    /// `None` uses [`BUNDLED_TEMPLATE`].
    template: Option<PathBuf>,
    /// `None` resolves `~/.m2/settings.xml` at write time.
    destination: Option<PathBuf>,
}

impl MavenSettings {
    /// Bundled template, written to `destination`.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            template: None,
            destination: Some(destination.into()),
        }
    }

    /// Configured template (or the bundled one). The home directory is
    /// only looked up when settings are actually written.
    pub fn from_config(config: &WebjarConfig) -> Self {
        Self::default().with_template(config.settings_template.clone())
    }

    pub fn with_template(mut self, template: Option<PathBuf>) -> Self {
        self.template = template;
        self
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn destination(&self) -> Result<PathBuf> {
        match &self.destination {
            Some(path) => Ok(path.clone()),
            None => user_settings_path(),
        }
    }

    fn template_text(&self) -> Result<Cow<'static, str>> {
        let Some(path) = &self.template else {
            return Ok(Cow::Borrowed(BUNDLED_TEMPLATE));
        };
        fs::read_to_string(path).map(Cow::Owned).map_err(|e| {
            WebjarError::config(format!(
                "settings template {} is missing: {e}",
                path.display()
            ))
        })
    }
}

impl SettingsStore for MavenSettings {
    fn write_local_repository(&self, local_repository: &str) -> Result<PathBuf> {
        let template = self.template_text()?;
        let patched = patch_local_repository(&template, local_repository)?;

        let destination = self.destination()?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| WebjarError::io(parent, e))?;
        }
        fs::write(&destination, patched).map_err(|e| WebjarError::io(&destination, e))?;

        Ok(destination)
    }
}

/// `<home>/.m2/settings.xml`.
pub fn user_settings_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WebjarError::config("unable to determine the user home directory"))?;
    Ok(home.join(".m2").join("settings.xml"))
}

/// Set the text of the first `<localRepository>` element, inserting one as
/// the first child of `<settings>` if the template has none.
pub fn patch_local_repository(xml: &str, local_repository: &str) -> Result<String> {
    let element = format!(
        "<localRepository>{}</localRepository>",
        escape_xml(local_repository)
    );

    let existing = regex(r"(?s)<localRepository\s*/>|<localRepository(?:\s[^>]*)?>.*?</localRepository>")?;
    if existing.is_match(xml) {
        return Ok(existing.replace(xml, NoExpand(&element)).into_owned());
    }

    let root = regex(r"<settings(?:\s[^>]*)?>")?;
    let Some(open) = root.find(xml) else {
        return Err(WebjarError::config(
            "settings template has no <settings> element",
        ));
    };
    if open.as_str().ends_with("/>") {
        return Err(WebjarError::config(
            "settings template has an empty <settings/> element",
        ));
    }

    let mut out = String::with_capacity(xml.len() + element.len() + 4);
    out.push_str(&xml[..open.end()]);
    out.push_str("\n  ");
    out.push_str(&element);
    out.push_str(&xml[open.end()..]);
    Ok(out)
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| WebjarError::config(format!("invalid settings pattern: {e}")))
}
