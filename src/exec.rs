//! Named tasks that run the Elide CLI with fixed arguments.
//!
//! An [`ExecTask`] is the unit a build schedules. It knows its arguments,
//! the diagnostics flags to prepend, and the marker file it leaves behind
//! after a successful run. The marker records the binary and command line,
//! so a later build only skips the task when both are unchanged.

use crate::cli::{CliInvocation, ElideCli, InvocationFailure};
use crate::error::{BuildError, Result};
use log::{debug, error, info};
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the task that runs `elide install`.
pub const INSTALL_TASK: &str = "elideInstall";

type Transformer = Box<dyn FnOnce(CliInvocation<()>) -> CliInvocation<()> + Send>;

/// Why a task did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The task has no arguments.
    NoArguments,
    /// No binary exists and silent mode is on.
    BinaryAbsent,
}

/// What [`ExecTask::run`] did.
#[derive(Debug)]
pub enum ExecOutcome {
    /// Nothing ran.
    Skipped(SkipReason),
    /// The process exited with status 0 and the marker was written.
    Succeeded,
    /// The process failed and a custom invocation chose to tolerate it.
    Failed(InvocationFailure),
}

/// A named run of the Elide CLI.
pub struct ExecTask {
    name: String,
    args: Vec<String>,
    debug: bool,
    verbose: bool,
    telemetry: bool,
    silent_mode: bool,
    marker: PathBuf,
    transformer: Option<Transformer>,
}

impl ExecTask {
    /// A task called `name` that records completion in `marker`.
    #[must_use]
    pub fn new(name: impl Into<String>, marker: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            debug: false,
            verbose: false,
            telemetry: true,
            silent_mode: false,
            marker: marker.into(),
            transformer: None,
        }
    }

    /// Append arguments. Empty strings are dropped.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(
            args.into_iter()
                .map(Into::into)
                .filter(|arg: &String| !arg.is_empty()),
        );
        self
    }

    /// Prepend `--debug`.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Prepend `--verbose`.
    #[must_use]
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Whether Elide may send telemetry. On by default.
    #[must_use]
    pub fn telemetry(mut self, enabled: bool) -> Self {
        self.telemetry = enabled;
        self
    }

    /// Skip instead of failing when the binary is missing.
    #[must_use]
    pub fn silent_mode(mut self, enabled: bool) -> Self {
        self.silent_mode = enabled;
        self
    }

    /// Replace the default output and failure wiring.
    ///
    /// The transformer receives the bare invocation. Failures it does not
    /// turn into success are returned as [`ExecOutcome::Failed`] rather than
    /// as errors.
    #[must_use]
    pub fn use_invocation<F>(mut self, transformer: F) -> Self
    where
        F: FnOnce(CliInvocation<()>) -> CliInvocation<()> + Send + 'static,
    {
        self.transformer = Some(Box::new(transformer));
        self
    }

    /// Task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether telemetry is enabled for this task.
    #[must_use]
    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry
    }

    /// Marker file written after a successful run.
    #[must_use]
    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Whether a previous run of this command line with the binary behind
    /// `cli` left its marker behind.
    #[must_use]
    pub fn is_up_to_date(&self, cli: Option<&ElideCli>) -> bool {
        let Some(cli) = cli else {
            return false;
        };
        std::fs::read_to_string(&self.marker)
            .is_ok_and(|recorded| recorded == self.fingerprint(cli.path()))
    }

    /// Marker contents: the binary path, then one argument per line.
    fn fingerprint(&self, binary: &Path) -> String {
        std::iter::once(binary.display().to_string())
            .chain(self.command_line())
            .map(|line| line + "\n")
            .collect()
    }

    /// The full argument list, diagnostics flags first.
    #[must_use]
    pub fn command_line(&self) -> Vec<String> {
        let flags = [(self.debug, "--debug"), (self.verbose, "--verbose")];
        flags
            .into_iter()
            .filter_map(|(enabled, flag)| enabled.then(|| flag.to_owned()))
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Run the task with `cli`, or note its absence when `cli` is `None`.
    ///
    /// # Errors
    ///
    /// - [`BuildError::BinaryNotFound`] when there is no binary and silent
    ///   mode is off.
    /// - [`BuildError::InvocationFailed`] when the default wiring sees a
    ///   non-zero exit or an execution error.
    /// - [`BuildError::Io`] when the marker cannot be written.
    pub fn run(self, cli: Option<&ElideCli>) -> Result<ExecOutcome> {
        if self.args.is_empty() {
            debug!(target: "elide", "task `{}` has no arguments; skipping", self.name);
            return Ok(ExecOutcome::Skipped(SkipReason::NoArguments));
        }

        let Some(cli) = cli.filter(|cli| cli.path().is_file()) else {
            if self.silent_mode {
                info!(target: "elide", "no Elide binary; skipping task `{}`", self.name);
                return Ok(ExecOutcome::Skipped(SkipReason::BinaryAbsent));
            }
            return Err(BuildError::BinaryNotFound {
                path: cli.map(|cli| cli.path().to_path_buf()),
            });
        };

        let args = self.command_line();
        let command = std::iter::once(cli.path().display().to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        info!(target: "elide", "task `{}`: {command}", self.name);

        let fingerprint = self.fingerprint(cli.path());
        let invocation = cli.create_invocation(args);
        let outcome = match self.transformer {
            Some(transform) => match transform(invocation).execute().into_result() {
                Ok(()) => ExecOutcome::Succeeded,
                Err(failure) => ExecOutcome::Failed(failure),
            },
            None => {
                default_wiring(invocation)
                    .execute()
                    .into_result()
                    .map_err(|failure| BuildError::InvocationFailed {
                        task: self.name.clone(),
                        command,
                        failure,
                    })?;
                ExecOutcome::Succeeded
            }
        };

        if matches!(outcome, ExecOutcome::Succeeded) {
            write_marker(&self.marker, &fingerprint)?;
        }
        Ok(outcome)
    }
}

impl fmt::Debug for ExecTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecTask")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("debug", &self.debug)
            .field("verbose", &self.verbose)
            .field("telemetry", &self.telemetry)
            .field("silent_mode", &self.silent_mode)
            .field("marker", &self.marker)
            .field("custom_invocation", &self.transformer.is_some())
            .finish()
    }
}

/// Build the `elideInstall` task.
///
/// `elide install` lets the CLI fetch the project's declared dependencies.
/// `--no-telemetry` is added when telemetry is disabled.
#[must_use]
pub fn install_task(marker: impl Into<PathBuf>, telemetry: bool) -> ExecTask {
    let task = ExecTask::new(INSTALL_TASK, marker)
        .telemetry(telemetry)
        .args(["install"]);
    if task.telemetry_enabled() {
        task
    } else {
        task.args(["--no-telemetry"])
    }
}

fn default_wiring(invocation: CliInvocation<()>) -> CliInvocation<()> {
    invocation
        .consume_stdout(|lines| {
            for line in lines {
                debug!(target: "elide", "{line}");
            }
        })
        .consume_stderr(|lines| {
            for line in lines {
                error!(target: "elide", "{line}");
            }
        })
}

fn write_marker(marker: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = marker.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(marker, contents)?;
    Ok(())
}
