//! Build orchestration: Regenerate, Configure, Clean, Build.

use crate::configure::ConfigureStep;
use crate::error::Result;
use crate::options::{BuildOptions, ResolvedOptions};
use crate::phase::{build_commands, clean_command, CommandLine, Phase};
use crate::runner::{execute_sequence, run_best_effort, CommandOutcome, ProcessRunner};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// The commands a run will execute, fixed before anything is spawned.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    /// Validated options the plan was built from.
    pub options: ResolvedOptions,

    /// autoconf invocation.
    pub regenerate: CommandLine,

    /// configure invocation.
    pub configure: CommandLine,

    /// Best-effort clean.
    pub clean: CommandLine,

    /// make, make check, make install.
    pub build: Vec<CommandLine>,
}

impl BuildPlan {
    /// Build the plan for validated options.
    pub fn new(options: ResolvedOptions) -> Self {
        let template = if options.template.is_absolute() {
            options.template.clone()
        } else {
            options.working_dir.join(&options.template)
        };

        Self {
            regenerate: CommandLine::autoconf(&template),
            configure: CommandLine::configure(&options.working_dir),
            clean: clean_command(),
            build: build_commands(),
            options,
        }
    }

    /// How configure will be attached.
    pub fn configure_step(&self) -> ConfigureStep {
        ConfigureStep::for_options(&self.options)
    }

    /// Every command paired with its phase, in execution order.
    pub fn commands(&self) -> Vec<(Phase, &CommandLine)> {
        let mut commands = vec![
            (Phase::Regenerate, &self.regenerate),
            (Phase::Configure, &self.configure),
            (Phase::Clean, &self.clean),
        ];
        commands.extend(self.build.iter().map(|c| (Phase::Build, c)));
        commands
    }
}

/// Result of a completed build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Identifier for this run, used in log lines.
    pub run_id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Outcome of every command that ran, in order.
    pub outcomes: Vec<CommandOutcome>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl BuildReport {
    /// Number of commands that exited 0.
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    /// Number of commands that exited non-zero. Only the best-effort clean
    /// can appear here; strict failures abort the run instead.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed()).count()
    }
}

/// Build orchestrator.
pub struct BuildOrchestrator {
    runner: Arc<dyn ProcessRunner>,
}

impl BuildOrchestrator {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Validate `options` and produce the plan without running anything.
    pub fn plan(options: BuildOptions) -> Result<BuildPlan> {
        Ok(BuildPlan::new(options.finalize()?))
    }

    /// Validate `options`, then run every phase in order.
    ///
    /// Option errors surface before any process starts. Regenerate,
    /// Configure and Build stop the run at their first failing command;
    /// Clean is observed and never stops it.
    pub async fn run(&self, options: BuildOptions) -> Result<BuildReport> {
        let plan = Self::plan(options)?;
        self.execute(&plan).await
    }

    /// Run an already validated plan.
    pub async fn execute(&self, plan: &BuildPlan) -> Result<BuildReport> {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let cwd = plan.options.working_dir.as_path();
        let runner = self.runner.as_ref();

        info!(
            run_id = %run_id,
            cwd = %cwd.display(),
            agreed = plan.options.agreed,
            "Starting build"
        );

        let mut outcomes = Vec::new();

        outcomes.extend(
            execute_sequence(runner, Phase::Regenerate, std::slice::from_ref(&plan.regenerate), cwd)
                .await?,
        );

        outcomes.push(
            plan.configure_step()
                .run(runner, &plan.configure, cwd)
                .await?,
        );

        outcomes.push(run_best_effort(runner, Phase::Clean, &plan.clean, cwd).await);

        outcomes.extend(execute_sequence(runner, Phase::Build, &plan.build, cwd).await?);

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(run_id = %run_id, duration_ms, "Build completed successfully");

        Ok(BuildReport {
            run_id,
            started_at,
            outcomes,
            duration_ms,
        })
    }
}
