//! External command execution seam.
//!
//! Used for helper tools such as `cosign`; the Elide binary itself is driven
//! by the streaming invocation engine in the `elide-build` crate instead.

use std::io;
use std::process::{Command, Output, Stdio};

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning or waiting for the
    /// command.
    fn run(&self, cmd: &str, args: &[String]) -> io::Result<Output>;
}

/// Executes commands on the host system.
///
/// # Examples
///
/// ```no_run
/// use elide_installer::command::{CommandExecutor, SystemCommandExecutor};
///
/// let output = SystemCommandExecutor.run("cosign", &["version".to_owned()])?;
/// assert!(output.status.success());
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[String]) -> io::Result<Output> {
        Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .output()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_output_and_status() {
        let output = SystemCommandExecutor
            .run("/bin/sh", &["-c".to_owned(), "echo hi; exit 3".to_owned()])
            .expect("spawn shell");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hi");
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let err = SystemCommandExecutor
            .run("/nonexistent/cosign", &[])
            .expect_err("no such program");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
