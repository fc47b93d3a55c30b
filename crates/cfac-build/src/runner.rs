//! External process execution.
//!
//! [`ProcessRunner`] is the seam between the orchestrator and the operating
//! system. [`SystemRunner`] spawns real processes; tests substitute
//! [`crate::fakes::RecordingRunner`].

use crate::error::{BuildError, Result};
use crate::phase::{CommandLine, Phase};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use std::future::Future;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Exit status reported for a process that ended without a code (signal).
pub const NO_EXIT_CODE: i32 = -1;

/// Outcome of one external command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Phase the command belongs to.
    pub phase: Phase,

    /// Rendered command line.
    pub command: String,

    /// Exit status (0 = success).
    pub exit_status: i32,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandOutcome {
    /// Whether this command passed (exit status 0).
    pub fn passed(&self) -> bool {
        self.exit_status == 0
    }
}

/// Runs external commands to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a command with the caller's stdin, stdout and stderr attached.
    async fn run(&self, command: &CommandLine, cwd: &Path) -> Result<i32>;

    /// Run a command with `input` written to its stdin and its stdout
    /// discarded. Stdin is closed once every chunk has been written.
    async fn run_scripted(&self, command: &CommandLine, cwd: &Path, input: &[&[u8]])
        -> Result<i32>;
}

/// Runner backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(command: &CommandLine, cwd: &Path) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).current_dir(cwd);
        cmd
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(NO_EXIT_CODE)
}

fn spawn_error(command: &CommandLine, source: std::io::Error) -> BuildError {
    BuildError::Spawn {
        command: command.to_string(),
        source,
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &CommandLine, cwd: &Path) -> Result<i32> {
        debug!(command = %command, cwd = %cwd.display(), "Spawning");

        let status = Self::command(command, cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| spawn_error(command, e))?;

        Ok(exit_code(status))
    }

    async fn run_scripted(
        &self,
        command: &CommandLine,
        cwd: &Path,
        input: &[&[u8]],
    ) -> Result<i32> {
        debug!(command = %command, cwd = %cwd.display(), "Spawning with scripted input");

        // Anonymous temp file: unlinked on creation, closed when dropped.
        let sink = tempfile::tempfile()?;

        let mut cmd = Self::command(command, cwd);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::from(sink))
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|e| spawn_error(command, e))?;
        // Release our copy of the sink; the child holds its own.
        drop(cmd);

        let stdin = child.stdin.take();
        let status = feed_then_wait(stdin, input, child.wait()).await?;
        Ok(exit_code(status))
    }
}

/// Write `input` to `writer` and shut it down. A broken pipe means the
/// reader went away early and is not an error.
async fn feed_answers<W>(writer: &mut W, input: &[&[u8]]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for chunk in input {
        match writer.write_all(chunk).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                warn!("Child closed stdin before reading all answers");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
    match writer.shutdown().await {
        Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    }
}

/// Feed `input` to the child's stdin, close it, then always await `wait`.
///
/// The child is waited on even when writing fails; the write error is
/// returned only after it has exited.
async fn feed_then_wait<W, F, T>(stdin: Option<W>, input: &[&[u8]], wait: F) -> Result<T>
where
    W: AsyncWrite + Unpin,
    F: Future<Output = std::io::Result<T>>,
{
    let fed = match stdin {
        Some(mut stdin) => feed_answers(&mut stdin, input).await,
        None => Ok(()),
    };
    // stdin is dropped here, so the child sees EOF before we wait.

    let waited = wait.await;
    if let Err(e) = &fed {
        warn!(error = %e, "Writing scripted answers failed");
    }
    let status = waited?;
    fed?;
    Ok(status)
}

/// Run `commands` in order, stopping at the first non-zero exit.
///
/// Returns the outcome of every command on success. The first failing
/// command becomes [`BuildError::PhaseFailed`]; later commands never start.
pub async fn execute_sequence(
    runner: &dyn ProcessRunner,
    phase: Phase,
    commands: &[CommandLine],
    cwd: &Path,
) -> Result<Vec<CommandOutcome>> {
    let mut outcomes = Vec::with_capacity(commands.len());

    for command in commands {
        info!(phase = %phase, command = %command, "Running");
        let start = Instant::now();
        let exit_status = runner.run(command, cwd).await?;
        let outcome = CommandOutcome {
            phase,
            command: command.to_string(),
            exit_status,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if !outcome.passed() {
            return Err(BuildError::PhaseFailed {
                phase,
                command: outcome.command,
                exit_status,
            });
        }
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Run a single command whose failure is logged but never escalated.
///
/// A command that cannot be spawned is reported with [`NO_EXIT_CODE`].
pub async fn run_best_effort(
    runner: &dyn ProcessRunner,
    phase: Phase,
    command: &CommandLine,
    cwd: &Path,
) -> CommandOutcome {
    info!(phase = %phase, command = %command, "Running (best effort)");
    let start = Instant::now();

    let exit_status = match runner.run(command, cwd).await {
        Ok(code) => code,
        Err(e) => {
            warn!(phase = %phase, error = %e, "Best-effort command could not run");
            NO_EXIT_CODE
        }
    };

    if exit_status != 0 {
        warn!(phase = %phase, command = %command, exit_status, "Ignoring failure");
    }

    CommandOutcome {
        phase,
        command: command.to_string(),
        exit_status,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configure::LICENSE_ANSWERS;
    use crate::fakes::RecordingRunner;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    /// Writer that fails every write with `kind` and flags when dropped.
    struct FailingWriter {
        kind: ErrorKind,
        dropped: Arc<AtomicBool>,
    }

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::new(self.kind, "write failed")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl Drop for FailingWriter {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh", ["-c", script])
    }

    #[test]
    fn test_command_outcome_passed() {
        let outcome = CommandOutcome {
            phase: Phase::Build,
            command: "make".to_string(),
            exit_status: 0,
            duration_ms: 10,
        };
        assert!(outcome.passed());
    }

    #[test]
    fn test_command_outcome_failed() {
        let outcome = CommandOutcome {
            phase: Phase::Build,
            command: "make".to_string(),
            exit_status: 2,
            duration_ms: 10,
        };
        assert!(!outcome.passed());
    }

    #[tokio::test]
    async fn test_system_runner_success() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let code = SystemRunner::new()
            .run(&CommandLine::new("true", Vec::<String>::new()), dir.path())
            .await
            .expect("run failed");
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_system_runner_reports_exit_code() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let code = SystemRunner::new()
            .run(&sh("exit 3"), dir.path())
            .await
            .expect("run failed");
        assert_eq!(code, 3);
    }

    #[tokio::test]
    async fn test_system_runner_uses_cwd() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let code = SystemRunner::new()
            .run(&sh("touch marker"), dir.path())
            .await
            .expect("run failed");
        assert_eq!(code, 0);
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let err = SystemRunner::new()
            .run(
                &CommandLine::new("cfac-definitely-missing-program", Vec::<String>::new()),
                dir.path(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_scripted_input_reaches_child() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        // Child echoes its answers to a file we can inspect, and floods
        // stdout to prove the sink never blocks it.
        let script = "read a; read b; printf '%s|%s' \"$a\" \"$b\" > answers; \
                      i=0; while [ $i -lt 2000 ]; do echo padding-line-$i; i=$((i+1)); done";
        let code = SystemRunner::new()
            .run_scripted(&sh(script), dir.path(), &LICENSE_ANSWERS)
            .await
            .expect("run failed");
        assert_eq!(code, 0);

        let answers = std::fs::read_to_string(dir.path().join("answers")).expect("read failed");
        assert_eq!(answers, "yes|");
    }

    #[tokio::test]
    async fn test_scripted_child_ignoring_stdin() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let code = SystemRunner::new()
            .run_scripted(&sh("exit 4"), dir.path(), &LICENSE_ANSWERS)
            .await
            .expect("run failed");
        assert_eq!(code, 4);
    }

    #[tokio::test]
    async fn test_execute_sequence_stops_at_first_failure() {
        let runner = RecordingRunner::new().fail_on("make check", 2);
        let commands = crate::phase::build_commands();

        let err = execute_sequence(&runner, Phase::Build, &commands, Path::new("/tmp"))
            .await
            .unwrap_err();

        match err {
            BuildError::PhaseFailed {
                phase,
                command,
                exit_status,
            } => {
                assert_eq!(phase, Phase::Build);
                assert_eq!(command, "make check");
                assert_eq!(exit_status, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.commands(), vec!["make", "make check"]);
    }

    #[tokio::test]
    async fn test_execute_sequence_all_pass() {
        let runner = RecordingRunner::new();
        let commands = crate::phase::build_commands();

        let outcomes = execute_sequence(&runner, Phase::Build, &commands, Path::new("/tmp"))
            .await
            .expect("sequence failed");
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(CommandOutcome::passed));
    }

    #[tokio::test]
    async fn test_best_effort_swallows_failure() {
        let runner = RecordingRunner::new().fail_on("make clean", 2);
        let outcome = run_best_effort(
            &runner,
            Phase::Clean,
            &crate::phase::clean_command(),
            Path::new("/tmp"),
        )
        .await;
        assert_eq!(outcome.exit_status, 2);
        assert!(!outcome.passed());
    }

    #[tokio::test]
    async fn test_best_effort_swallows_spawn_error() {
        let runner = RecordingRunner::new().unspawnable("make clean");
        let outcome = run_best_effort(
            &runner,
            Phase::Clean,
            &crate::phase::clean_command(),
            Path::new("/tmp"),
        )
        .await;
        assert_eq!(outcome.exit_status, NO_EXIT_CODE);
    }

    #[tokio::test]
    async fn test_failed_write_still_waits_for_child() {
        let dropped = Arc::new(AtomicBool::new(false));
        let waited = Arc::new(AtomicBool::new(false));
        let writer = FailingWriter {
            kind: ErrorKind::Other,
            dropped: dropped.clone(),
        };

        let wait = {
            let dropped = dropped.clone();
            let waited = waited.clone();
            async move {
                assert!(dropped.load(Ordering::SeqCst), "stdin must close before waiting");
                waited.store(true, Ordering::SeqCst);
                Ok::<i32, std::io::Error>(0)
            }
        };

        let err = feed_then_wait(Some(writer), &LICENSE_ANSWERS, wait)
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Io(ref e) if e.kind() == ErrorKind::Other));
        assert!(waited.load(Ordering::SeqCst), "child must be waited on");
    }

    #[tokio::test]
    async fn test_broken_pipe_write_returns_child_status() {
        let writer = FailingWriter {
            kind: ErrorKind::BrokenPipe,
            dropped: Arc::new(AtomicBool::new(false)),
        };

        let status = feed_then_wait(Some(writer), &LICENSE_ANSWERS, async {
            Ok::<i32, std::io::Error>(5)
        })
        .await
        .expect("broken pipe should not fail the run");
        assert_eq!(status, 5);
    }

    #[tokio::test]
    async fn test_feed_answers_writes_exact_bytes() {
        let mut written: Vec<u8> = Vec::new();
        feed_answers(&mut written, &LICENSE_ANSWERS)
            .await
            .expect("feed failed");
        assert_eq!(written, b"yes\n\n");
    }
}
