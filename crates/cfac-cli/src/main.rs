//! cfac - build orchestration CLI
//!
//! The `cfac` command drives the autoconf/configure/make toolchain.
//!
//! ## Commands
//!
//! - `make`: regenerate, configure, clean, then build, check and install
//! - `plan`: print the commands `make` would run

use anyhow::{Context, Result};
use cfac_build::{BuildOptions, BuildOrchestrator, BuildReport, SystemRunner};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "cfac")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build the cfac library with autoconf and make", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate, configure, clean, build, check and install
    Make {
        #[command(flatten)]
        build: BuildArgs,

        /// Print the build report as JSON on success
        #[arg(long)]
        report_json: bool,
    },

    /// Show the commands `make` would run, without running them
    Plan {
        #[command(flatten)]
        build: BuildArgs,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Agree to the CPC license; the only accepted value is `yes`
    #[arg(short = 'a', long = "agree-cpc", env = "CFAC_AGREE_CPC")]
    agree_cpc: Option<String>,

    /// Project root (default: current directory)
    #[arg(short = 'C', long = "dir", default_value = ".")]
    dir: PathBuf,

    /// autoconf template, relative to the project root
    #[arg(long, default_value = cfac_build::phase::DEFAULT_TEMPLATE)]
    template: PathBuf,
}

impl BuildArgs {
    fn into_options(self) -> BuildOptions {
        let options = BuildOptions::new()
            .with_working_dir(self.dir)
            .with_template(self.template);
        match self.agree_cpc {
            Some(value) => options.with_license_agreement(value),
            None => options,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    cfac_build::init_tracing(cli.json, level);

    match cli.command {
        Commands::Make { build, report_json } => cmd_make(build, report_json).await,
        Commands::Plan { build } => cmd_plan(build),
    }
}

async fn cmd_make(args: BuildArgs, report_json: bool) -> Result<()> {
    let orchestrator = BuildOrchestrator::new(Arc::new(SystemRunner::new()));
    let report = orchestrator
        .run(args.into_options())
        .await
        .context("Install failed")?;

    if report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn cmd_plan(args: BuildArgs) -> Result<()> {
    let plan = BuildOrchestrator::plan(args.into_options())?;

    println!("Project root: {}", plan.options.working_dir.display());
    println!("Configure mode: {:?}", plan.configure_step());
    println!();
    for (phase, command) in plan.commands() {
        println!("  [{}] {}", phase, command);
    }
    Ok(())
}

fn print_report(report: &BuildReport) {
    println!();
    println!("Run ID: {}", report.run_id);
    println!("Duration: {}ms", report.duration_ms);
    println!();

    for outcome in &report.outcomes {
        let status = if outcome.passed() { "✓" } else { "✗ (ignored)" };
        println!(
            "  {} [{}] {} ({}ms, exit code: {})",
            status, outcome.phase, outcome.command, outcome.duration_ms, outcome.exit_status
        );
    }

    println!();
    println!(
        "Summary: {}/{} commands passed",
        report.passed_count(),
        report.outcomes.len()
    );
}
