//! Error types for the build integration.
//!
//! Installer failures are wrapped unchanged. The remaining variants cover
//! what happens after a binary has been resolved: version checks, task
//! execution and settings.

use crate::cli::InvocationFailure;
use elide_installer::error::InstallerError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the build integration.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Resolving or installing the binary failed.
    #[error(transparent)]
    Installer(#[from] InstallerError),

    /// No binary could be resolved and silent mode is off.
    #[error(
        "no Elide binary is available{}; install Elide, set ELIDE_BIN_PATH, \
         or set `binary.silent-mode = true` to skip Elide tasks",
        path.as_ref().map(|path| format!(" at {}", path.display())).unwrap_or_default()
    )]
    BinaryNotFound {
        /// Where the binary was expected, when known.
        path: Option<PathBuf>,
    },

    /// The local binary reports a different version than the one required.
    #[error(
        "Elide at {} reports version \"{reported}\" but \"{required}\" is required; \
         install the required version or disable `binary.strict-version-check`",
        path.display()
    )]
    VersionMismatch {
        /// Version from the configuration.
        required: String,
        /// Version printed by the binary.
        reported: String,
        /// The binary that was queried.
        path: PathBuf,
    },

    /// A task's invocation exited non-zero or could not run.
    #[error("task `{task}` failed running `{command}`: {failure}")]
    InvocationFailed {
        /// Task name.
        task: String,
        /// Command line that was run.
        command: String,
        /// How it failed.
        #[source]
        failure: InvocationFailure,
    },

    /// A settings file could not be read or parsed.
    #[error("invalid settings in {}: {reason}", path.display())]
    Config {
        /// The settings file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// An environment override holds an unusable value.
    #[error("environment variable {var} has invalid value \"{value}\"; expected `true` or `false`")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The worker pool could not be started.
    #[error("unable to start the worker pool: {0}")]
    Pool(#[source] std::io::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`BuildError`].
pub type Result<T> = std::result::Result<T, BuildError>;
