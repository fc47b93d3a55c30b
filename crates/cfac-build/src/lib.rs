//! cfac build - autoconf/configure/make orchestration
//!
//! Runs the native toolchain as one step:
//! - Regenerate `configure` from the autoconf template
//! - Configure, interactively or with the license prompt answered
//! - Clean (best effort)
//! - Build, check and install

pub mod configure;
pub mod error;
pub mod fakes;
pub mod options;
pub mod orchestrator;
pub mod phase;
pub mod runner;
pub mod telemetry;

// Re-export key types
pub use configure::{ConfigureStep, LICENSE_ANSWERS};
pub use error::{BuildError, Result};
pub use options::{BuildOptions, ResolvedOptions};
pub use orchestrator::{BuildOrchestrator, BuildPlan, BuildReport};
pub use phase::{CommandLine, Phase};
pub use runner::{CommandOutcome, ProcessRunner, SystemRunner};
pub use telemetry::init_tracing;
