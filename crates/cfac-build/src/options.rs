//! Build options and their validation.

use crate::error::{BuildError, Result};
use crate::phase::DEFAULT_TEMPLATE;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// The only accepted value for the license agreement.
pub const AGREE: &str = "yes";

/// Raw options as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildOptions {
    /// Value of `--agree-cpc`; must be `yes` when present.
    pub license_agreement: Option<String>,

    /// Project root the toolchain runs in.
    pub working_dir: PathBuf,

    /// autoconf template, relative to `working_dir` unless absolute.
    pub template: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            license_agreement: None,
            working_dir: PathBuf::from("."),
            template: PathBuf::from(DEFAULT_TEMPLATE),
        }
    }
}

impl BuildOptions {
    /// Options for the current directory with no license agreement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the license agreement value.
    pub fn with_license_agreement(mut self, value: impl Into<String>) -> Self {
        self.license_agreement = Some(value.into());
        self
    }

    /// Set the project root.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Set the autoconf template path.
    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = template.into();
        self
    }

    /// Validate the options and resolve the working directory.
    ///
    /// Fails with [`BuildError::InvalidOption`] when an agreement value other
    /// than `yes` was given. The working directory is made absolute so the
    /// configure prefix never depends on shell expansion.
    pub fn finalize(self) -> Result<ResolvedOptions> {
        let agreed = match self.license_agreement {
            None => false,
            Some(value) if value == AGREE => true,
            Some(value) => return Err(BuildError::InvalidOption(value)),
        };

        let working_dir = if self.working_dir.is_absolute() {
            self.working_dir
        } else {
            std::env::current_dir()?.join(self.working_dir)
        };

        Ok(ResolvedOptions {
            agreed,
            working_dir: without_cur_dir(&working_dir),
            template: without_cur_dir(&self.template),
        })
    }
}

/// Drop `.` segments so paths baked into the install stay clean.
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Options that passed validation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Whether the license prompt is answered automatically.
    pub agreed: bool,

    /// Absolute project root.
    pub working_dir: PathBuf,

    /// autoconf template path.
    pub template: PathBuf,
}
