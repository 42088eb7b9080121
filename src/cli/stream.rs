//! Live, single-consumption views of a child process's output.
//!
//! An [`OutputStream`] exists before the process does. Readers that arrive
//! early block on a condition variable until the process starts and the
//! pipe is attached. The first reader takes the pipe; later readers see an
//! empty stream.

use log::debug;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

type Pipe = Box<dyn Read + Send>;

enum StreamState {
    /// The process has not started yet.
    Unattached,
    /// The pipe is available to the first reader.
    Attached(Pipe),
    /// A reader took the pipe.
    Exhausted,
    /// The process never started; there is nothing to read.
    Detached,
}

struct Shared {
    state: Mutex<StreamState>,
    ready: Condvar,
    claimed: AtomicBool,
}

/// Handle on one output stream of a (possibly future) process.
///
/// Clones share the same underlying pipe.
#[derive(Clone)]
pub struct OutputStream {
    name: &'static str,
    shared: Arc<Shared>,
}

impl OutputStream {
    /// A stream that will be attached later.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            shared: Arc::new(Shared {
                state: Mutex::new(StreamState::Unattached),
                ready: Condvar::new(),
                claimed: AtomicBool::new(false),
            }),
        }
    }

    /// Stream label, `stdout` or `stderr`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the stream line by line.
    ///
    /// Blocks until the process has started. Returns an empty iterator when
    /// another reader already took the stream or the process never started.
    #[must_use]
    pub fn lines(&self) -> Lines {
        self.claim();
        let guard = self.lock();
        let mut guard = self
            .shared
            .ready
            .wait_while(guard, |state| matches!(state, StreamState::Unattached))
            .unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *guard, StreamState::Exhausted) {
            StreamState::Attached(pipe) => Lines {
                name: self.name,
                reader: Some(BufReader::new(pipe)),
            },
            StreamState::Detached => {
                *guard = StreamState::Detached;
                Lines::empty(self.name)
            }
            StreamState::Exhausted | StreamState::Unattached => Lines::empty(self.name),
        }
    }

    /// Record that a reader has been scheduled.
    pub(crate) fn claim(&self) {
        self.shared.claimed.store(true, Ordering::SeqCst);
    }

    /// Whether any reader was scheduled or started.
    pub(crate) fn is_claimed(&self) -> bool {
        self.shared.claimed.load(Ordering::SeqCst)
    }

    /// Hand the process's pipe to waiting readers.
    pub(crate) fn attach(&self, pipe: impl Read + Send + 'static) {
        let mut guard = self.lock();
        if matches!(*guard, StreamState::Unattached) {
            *guard = StreamState::Attached(Box::new(pipe));
        }
        self.shared.ready.notify_all();
    }

    /// Release waiting readers when the process failed to start.
    pub(crate) fn detach(&self) {
        let mut guard = self.lock();
        if matches!(*guard, StreamState::Unattached) {
            *guard = StreamState::Detached;
        }
        self.shared.ready.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.lock() {
            StreamState::Unattached => "unattached",
            StreamState::Attached(_) => "attached",
            StreamState::Exhausted => "exhausted",
            StreamState::Detached => "detached",
        };
        f.debug_struct("OutputStream")
            .field("name", &self.name)
            .field("state", &state)
            .finish()
    }
}

/// Lines of an [`OutputStream`], without their terminators.
///
/// Invalid UTF-8 is replaced rather than treated as an error. A read error
/// ends the iteration.
pub struct Lines {
    name: &'static str,
    reader: Option<BufReader<Pipe>>,
}

impl Lines {
    fn empty(name: &'static str) -> Self {
        Self { name, reader: None }
    }
}

impl Iterator for Lines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.reader = None;
                None
            }
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                Some(String::from_utf8_lossy(&buf).into_owned())
            }
            Err(err) => {
                debug!(target: "elide", "stopped reading {}: {err}", self.name);
                self.reader = None;
                None
            }
        }
    }
}

impl fmt::Debug for Lines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lines")
            .field("name", &self.name)
            .field("open", &self.reader.is_some())
            .finish()
    }
}
