//! Build phases and the command lines they run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default location of the autoconf template, relative to the project root.
pub const DEFAULT_TEMPLATE: &str = "ac-tools/configure.ac";

/// The four phases of a build, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// autoconf -o configure <template>
    Regenerate,

    /// ./configure --prefix=<dir>/bin --with-cpc-modules
    Configure,

    /// make clean
    Clean,

    /// make, make check, make install
    Build,
}

impl Phase {
    /// Get the phase name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Regenerate => "regenerate",
            Phase::Configure => "configure",
            Phase::Clean => "clean",
            Phase::Build => "build",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single external command: program plus arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable (looked up on PATH unless it contains a slash).
    pub program: String,

    /// Arguments, passed verbatim with no shell expansion.
    pub args: Vec<String>,
}

impl CommandLine {
    /// Build a command line from a program and its arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `autoconf -o configure <template>`
    pub fn autoconf(template: &Path) -> Self {
        Self::new(
            "autoconf",
            ["-o".to_string(), "configure".to_string(), template.display().to_string()],
        )
    }

    /// `./configure --prefix=<root>/bin --with-cpc-modules`
    pub fn configure(project_root: &Path) -> Self {
        Self::new(
            "./configure",
            [
                format!("--prefix={}", project_root.join("bin").display()),
                "--with-cpc-modules".to_string(),
            ],
        )
    }

    /// `make [target]`
    pub fn make(target: Option<&str>) -> Self {
        Self::new("make", target)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Commands run by the Build phase, in order.
pub fn build_commands() -> Vec<CommandLine> {
    vec![
        CommandLine::make(None),
        CommandLine::make(Some("check")),
        CommandLine::make(Some("install")),
    ]
}

/// Command run by the Clean phase.
pub fn clean_command() -> CommandLine {
    CommandLine::make(Some("clean"))
}
