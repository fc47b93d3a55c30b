//! The two ways of driving `./configure`.

use crate::error::{BuildError, Result};
use crate::options::ResolvedOptions;
use crate::phase::{CommandLine, Phase};
use crate::runner::{CommandOutcome, ProcessRunner};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Answers fed to configure when the license is agreed up front: `yes` to
/// the license prompt, then an empty line to accept the default.
pub const LICENSE_ANSWERS: [&[u8]; 2] = [b"yes\n", b"\n"];

/// How the configure command is attached to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureStep {
    /// Inherit stdin/stdout so a human can answer the license prompt.
    Interactive,
    /// Pipe [`LICENSE_ANSWERS`] into stdin and discard stdout.
    Scripted,
}

impl ConfigureStep {
    pub fn for_options(options: &ResolvedOptions) -> Self {
        if options.agreed {
            ConfigureStep::Scripted
        } else {
            ConfigureStep::Interactive
        }
    }

    /// Run `command` and fail on a non-zero exit, whichever variant is used.
    pub async fn run(
        self,
        runner: &dyn ProcessRunner,
        command: &CommandLine,
        cwd: &Path,
    ) -> Result<CommandOutcome> {
        info!(phase = %Phase::Configure, command = %command, mode = ?self, "Running");
        let start = Instant::now();

        let exit_status = match self {
            ConfigureStep::Interactive => runner.run(command, cwd).await?,
            ConfigureStep::Scripted => runner.run_scripted(command, cwd, &LICENSE_ANSWERS).await?,
        };

        if exit_status != 0 {
            return Err(BuildError::PhaseFailed {
                phase: Phase::Configure,
                command: command.to_string(),
                exit_status,
            });
        }

        Ok(CommandOutcome {
            phase: Phase::Configure,
            command: command.to_string(),
            exit_status,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
