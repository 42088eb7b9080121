//! Running the Elide CLI.
//!
//! [`ElideCli`] binds a resolved binary to a working directory and the
//! build's worker pool, and hands out lazy [`CliInvocation`]s.

mod invocation;
mod result;
mod stream;

pub use invocation::{CapturedOutput, CliInvocation};
pub use result::{InvocationError, InvocationFailure, InvocationResult};
pub use stream::{Lines, OutputStream};

use crate::pool::PoolHandle;
use std::path::{Path, PathBuf};

/// Argument asking the CLI for its version.
pub const VERSION_ARG: &str = "--version";

/// A resolved Elide binary ready to be invoked.
#[derive(Debug, Clone)]
pub struct ElideCli {
    path: PathBuf,
    working_dir: PathBuf,
    pool: PoolHandle,
}

impl ElideCli {
    /// Bind `path` to `working_dir` and `pool`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, working_dir: impl Into<PathBuf>, pool: PoolHandle) -> Self {
        Self {
            path: path.into(),
            working_dir: working_dir.into(),
            pool,
        }
    }

    /// The binary this handle runs.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the binary runs in.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Prepare a run with `args`. Nothing starts until it is executed.
    #[must_use]
    pub fn create_invocation<I, S>(&self, args: I) -> CliInvocation<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(Into::into).collect();
        CliInvocation::spawn(&self.path, args, &self.working_dir, self.pool.clone())
    }

    /// Ask the binary for its version, trimmed.
    pub fn get_version(&self) -> InvocationResult<String> {
        self.create_invocation([VERSION_ARG])
            .with_captured_stdout()
            .execute()
    }
}
