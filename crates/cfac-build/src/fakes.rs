//! In-memory process runner (testing only)
//!
//! [`RecordingRunner`] satisfies the [`ProcessRunner`] contract without
//! spawning anything. It records every invocation in order and answers with
//! scripted exit statuses.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{BuildError, Result};
use crate::phase::CommandLine;
use crate::runner::ProcessRunner;

/// How a recorded command was attached to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdioMode {
    /// Caller's stdin/stdout inherited.
    Inherited,
    /// Stdin fed from a script; the bytes written are kept.
    Scripted(Vec<u8>),
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: CommandLine,
    pub cwd: PathBuf,
    pub stdio: StdioMode,
}

/// Fake runner keyed by rendered command line.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    exit_codes: HashMap<String, i32>,
    unspawnable: HashSet<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `command` exit with `code` (0 is the default for everything).
    pub fn fail_on(mut self, command: &str, code: i32) -> Self {
        self.exit_codes.insert(command.to_string(), code);
        self
    }

    /// Make `command` fail to spawn.
    pub fn unspawnable(mut self, command: &str) -> Self {
        self.unspawnable.insert(command.to_string());
        self
    }

    /// Every invocation so far, in call order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Rendered command lines, in call order.
    pub fn commands(&self) -> Vec<String> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.command.to_string())
            .collect()
    }

    fn record(&self, command: &CommandLine, cwd: &Path, stdio: StdioMode) -> Result<i32> {
        self.invocations.lock().unwrap().push(Invocation {
            command: command.clone(),
            cwd: cwd.to_path_buf(),
            stdio,
        });

        let rendered = command.to_string();
        if self.unspawnable.contains(&rendered) {
            return Err(BuildError::Spawn {
                command: rendered,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        Ok(self.exit_codes.get(&rendered).copied().unwrap_or(0))
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, command: &CommandLine, cwd: &Path) -> Result<i32> {
        self.record(command, cwd, StdioMode::Inherited)
    }

    async fn run_scripted(
        &self,
        command: &CommandLine,
        cwd: &Path,
        input: &[&[u8]],
    ) -> Result<i32> {
        self.record(command, cwd, StdioMode::Scripted(input.concat()))
    }
}
