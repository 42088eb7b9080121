//! Build integration for the Elide CLI.
//!
//! Resolves which `elide` binary a build uses, installs and verifies it
//! through [`elide_installer`], and runs it as part of the build with live
//! output streaming and structured results.
//!
//! # Modules
//!
//! - [`args`] - Command-line arguments of the `elide-build` binary
//! - [`cli`] - Lazy, composable invocations of the binary
//! - [`config`] - Layered settings from `elide.toml` and the environment
//! - [`error`] - Error types with remediation hints
//! - [`exec`] - Named tasks with completion markers
//! - [`pipeline`] - Per-build orchestration
//! - [`pool`] - Worker pool for output consumers
//! - [`version`] - Strict version checking

pub mod args;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod pipeline;
pub mod pool;
pub mod version;

pub use cli::{CliInvocation, ElideCli, InvocationResult};
pub use config::Settings;
pub use error::{BuildError, Result};
pub use pipeline::BuildPipeline;
