//! Lazy, composable handles on a single run of the Elide CLI.
//!
//! A [`CliInvocation`] is built without starting anything. Combinators wrap
//! the pending operation and return a new handle sharing the same output
//! streams. [`CliInvocation::execute`] consumes the handle, starts the
//! process, waits for it to exit and returns the [`InvocationResult`].

use super::result::{InvocationError, InvocationResult};
use super::stream::{Lines, OutputStream};
use crate::pool::PoolHandle;
use log::debug;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;

type Operation<T> = Box<dyn FnOnce() -> InvocationResult<T> + Send>;

/// A not-yet-executed CLI run and its live output streams.
pub struct CliInvocation<T> {
    operation: Operation<T>,
    stdout: OutputStream,
    stderr: OutputStream,
    pool: PoolHandle,
}

/// Stdout and stderr captured from one successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Captured stdout lines joined with `\n` and trimmed.
    pub stdout: String,
    /// Captured stderr lines joined with `\n` and trimmed.
    pub stderr: String,
}

impl CapturedOutput {
    /// Stdout followed by stderr, skipping whichever is empty.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
            (false, true) => self.stdout.clone(),
            (true, _) => self.stderr.clone(),
        }
    }
}

impl CliInvocation<()> {
    /// Prepare a run of `program` with `args` inside `working_dir`.
    ///
    /// Nothing happens until [`execute`](Self::execute) is called. Streams
    /// that no reader has claimed by then are drained and discarded so the
    /// child never blocks on a full pipe.
    #[must_use]
    pub fn spawn(
        program: &Path,
        args: Vec<String>,
        working_dir: &Path,
        pool: PoolHandle,
    ) -> Self {
        let stdout = OutputStream::new("stdout");
        let stderr = OutputStream::new("stderr");
        let operation = {
            let program = program.to_path_buf();
            let working_dir = working_dir.to_path_buf();
            let stdout = stdout.clone();
            let stderr = stderr.clone();
            let pool = pool.clone();
            Box::new(move || run_process(&program, &args, &working_dir, &stdout, &stderr, &pool))
        };
        Self {
            operation,
            stdout,
            stderr,
            pool,
        }
    }
}

impl<T: Send + 'static> CliInvocation<T> {
    /// The stdout handle.
    ///
    /// Taking the handle claims the stream: it will not be drained
    /// automatically, so the caller must read it while the process runs.
    #[must_use]
    pub fn stdout(&self) -> OutputStream {
        self.stdout.claim();
        self.stdout.clone()
    }

    /// The stderr handle. See [`stdout`](Self::stdout).
    #[must_use]
    pub fn stderr(&self) -> OutputStream {
        self.stderr.claim();
        self.stderr.clone()
    }

    /// Start the process, wait for it to exit and return the outcome.
    ///
    /// Blocks the calling thread. Consumers scheduled with
    /// [`consume_stdout`](Self::consume_stdout) may still be finishing on
    /// the pool when this returns.
    pub fn execute(self) -> InvocationResult<T> {
        (self.operation)()
    }

    /// Transform the success payload; failures pass through.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> CliInvocation<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let inner = self.operation;
        CliInvocation {
            operation: Box::new(move || inner().map(f)),
            stdout: self.stdout,
            stderr: self.stderr,
            pool: self.pool,
        }
    }

    /// Alias of [`map`](Self::map) matching the builder vocabulary.
    #[must_use]
    pub fn map_success<U, F>(self, f: F) -> CliInvocation<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.map(f)
    }

    /// Read stdout line by line on the pool while the process runs.
    #[must_use]
    pub fn consume_stdout<F>(self, consumer: F) -> Self
    where
        F: FnOnce(Lines) + Send + 'static,
    {
        let stream = self.stdout.clone();
        self.consume(stream, consumer)
    }

    /// Read stderr line by line on the pool while the process runs.
    #[must_use]
    pub fn consume_stderr<F>(self, consumer: F) -> Self
    where
        F: FnOnce(Lines) + Send + 'static,
    {
        let stream = self.stderr.clone();
        self.consume(stream, consumer)
    }

    fn consume<F>(self, stream: OutputStream, consumer: F) -> Self
    where
        F: FnOnce(Lines) + Send + 'static,
    {
        stream.claim();
        let pool = self.pool.clone();
        self.before(move || pool.execute(move || consumer(stream.lines())))
    }

    /// Call `hook` with the payload when the process exits with status 0.
    #[must_use]
    pub fn on_success<F>(self, hook: F) -> Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.inspect(move |result| {
            if let InvocationResult::Success(value) = result {
                hook(value);
            }
        })
    }

    /// Call `hook` with the exit code when the process exits non-zero.
    #[must_use]
    pub fn on_non_zero_exit_code<F>(self, hook: F) -> Self
    where
        F: FnOnce(i32) + Send + 'static,
    {
        self.inspect(move |result| {
            if let InvocationResult::ExitFailure(code) = result {
                hook(*code);
            }
        })
    }

    /// Call `hook` when the process could not be started or waited for.
    #[must_use]
    pub fn on_exception<F>(self, hook: F) -> Self
    where
        F: FnOnce(&InvocationError) + Send + 'static,
    {
        self.inspect(move |result| {
            if let InvocationResult::Error(err) = result {
                hook(err);
            }
        })
    }

    /// Replace the payload with the captured stdout.
    ///
    /// Only a successful run carries the text. The stream is still drained
    /// on failure. When another consumer also reads stdout, only one of
    /// them sees the data.
    #[must_use]
    pub fn with_captured_stdout(self) -> CliInvocation<String> {
        let stream = self.stdout.clone();
        let (prepare, collect) = capture(stream, self.pool.clone());
        self.before(prepare).map(move |_| collect())
    }

    /// Replace the payload with both captured streams.
    #[must_use]
    pub fn with_captured_stdout_and_stderr(self) -> CliInvocation<CapturedOutput> {
        let (prepare_out, collect_out) = capture(self.stdout.clone(), self.pool.clone());
        let (prepare_err, collect_err) = capture(self.stderr.clone(), self.pool.clone());
        self.before(move || {
            prepare_out();
            prepare_err();
        })
        .map(move |_| CapturedOutput {
            stdout: collect_out(),
            stderr: collect_err(),
        })
    }

    fn before<F>(self, setup: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let inner = self.operation;
        Self {
            operation: Box::new(move || {
                setup();
                inner()
            }),
            ..self
        }
    }

    fn inspect<F>(self, hook: F) -> Self
    where
        F: FnOnce(&InvocationResult<T>) + Send + 'static,
    {
        let inner = self.operation;
        Self {
            operation: Box::new(move || {
                let result = inner();
                hook(&result);
                result
            }),
            ..self
        }
    }
}

impl<T> fmt::Debug for CliInvocation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliInvocation")
            .field("stdout", &self.stdout)
            .field("stderr", &self.stderr)
            .finish_non_exhaustive()
    }
}

/// Claim `stream` now; return a setup step that drains it on the pool and a
/// collector that waits for the drained text.
fn capture(
    stream: OutputStream,
    pool: PoolHandle,
) -> (
    impl FnOnce() + Send + 'static,
    impl FnOnce() -> String + Send + 'static,
) {
    stream.claim();
    let (tx, rx) = mpsc::channel::<String>();
    let prepare = move || {
        pool.execute(move || {
            let text = stream.lines().collect::<Vec<_>>().join("\n");
            drop(tx.send(text));
        });
    };
    let collect = move || rx.recv().unwrap_or_default().trim().to_owned();
    (prepare, collect)
}

fn run_process(
    program: &Path,
    args: &[String],
    working_dir: &Path,
    stdout: &OutputStream,
    stderr: &OutputStream,
    pool: &PoolHandle,
) -> InvocationResult<()> {
    let name = program.display().to_string();
    debug!(target: "elide", "running {name} {}", args.join(" "));

    let spawned = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(source) => {
            stdout.detach();
            stderr.detach();
            return InvocationResult::Error(InvocationError::Spawn {
                program: name,
                source,
            });
        }
    };

    hand_over(stdout, child.stdout.take(), pool);
    hand_over(stderr, child.stderr.take(), pool);

    match child.wait() {
        Ok(status) => exit_result(status),
        Err(source) => {
            drop(child.kill());
            InvocationResult::Error(InvocationError::Wait {
                program: name,
                source,
            })
        }
    }
}

fn hand_over(stream: &OutputStream, pipe: Option<impl Read + Send + 'static>, pool: &PoolHandle) {
    match pipe {
        Some(pipe) => stream.attach(pipe),
        None => stream.detach(),
    }
    if !stream.is_claimed() {
        let stream = stream.clone();
        pool.execute(move || stream.lines().for_each(drop));
    }
}

fn exit_result(status: ExitStatus) -> InvocationResult<()> {
    match status.code() {
        Some(0) => InvocationResult::Success(()),
        Some(code) => InvocationResult::ExitFailure(code),
        None => InvocationResult::ExitFailure(signal_exit_code(status)),
    }
}

/// Shell convention for a process killed by signal `n`: `128 + n`.
#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map_or(-1, |signal| 128 + signal)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: ExitStatus) -> i32 {
    -1
}
