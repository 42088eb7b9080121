//! Outcome of running the Elide CLI.

use std::fmt;
use thiserror::Error;

/// Why a process could not be run to completion.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The process could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// Program that was launched.
        program: String,
        /// Spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the process to exit failed or was interrupted.
    #[error("failed while waiting for `{program}`: {source}")]
    Wait {
        /// Program that was running.
        program: String,
        /// Wait error.
        #[source]
        source: std::io::Error,
    },
}

/// Result of one CLI invocation.
///
/// Exactly one of success, non-zero exit, or execution error. Success-only
/// transformations leave both failure kinds untouched.
#[derive(Debug)]
pub enum InvocationResult<T> {
    /// The process exited with status 0.
    Success(T),
    /// The process ran and exited with a non-zero status.
    ExitFailure(i32),
    /// The process could not be started or waited for.
    Error(InvocationError),
}

/// The failure half of an [`InvocationResult`].
#[derive(Debug, Error)]
pub enum InvocationFailure {
    /// Non-zero exit status.
    #[error("process finished with non-success exit code {0}")]
    ExitFailure(i32),
    /// Execution error.
    #[error(transparent)]
    Error(#[from] InvocationError),
}

impl<T> InvocationResult<T> {
    /// Whether the process exited with status 0.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether this is either failure kind.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Transform the success value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> InvocationResult<U> {
        match self {
            Self::Success(value) => InvocationResult::Success(f(value)),
            Self::ExitFailure(code) => InvocationResult::ExitFailure(code),
            Self::Error(err) => InvocationResult::Error(err),
        }
    }

    /// Chain another fallible step onto a success.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> InvocationResult<U>) -> InvocationResult<U> {
        match self {
            Self::Success(value) => f(value),
            Self::ExitFailure(code) => InvocationResult::ExitFailure(code),
            Self::Error(err) => InvocationResult::Error(err),
        }
    }

    /// Convert into a standard `Result`.
    ///
    /// # Errors
    ///
    /// Returns the failure when the invocation did not succeed.
    pub fn into_result(self) -> Result<T, InvocationFailure> {
        match self {
            Self::Success(value) => Ok(value),
            Self::ExitFailure(code) => Err(InvocationFailure::ExitFailure(code)),
            Self::Error(err) => Err(InvocationFailure::Error(err)),
        }
    }

    /// The success value, or whatever `fallback` makes of the failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use elide_build::cli::{InvocationFailure, InvocationResult};
    ///
    /// let failed: InvocationResult<String> = InvocationResult::ExitFailure(2);
    /// let text = failed.get_success_or_else(|failure| match failure {
    ///     InvocationFailure::ExitFailure(code) => format!("exit {code}"),
    ///     InvocationFailure::Error(err) => err.to_string(),
    /// });
    /// assert_eq!(text, "exit 2");
    /// ```
    pub fn get_success_or_else(self, fallback: impl FnOnce(InvocationFailure) -> T) -> T {
        self.into_result().unwrap_or_else(fallback)
    }

    /// The non-zero exit code, if that is how the invocation ended.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExitFailure(code) => Some(*code),
            Self::Success(_) | Self::Error(_) => None,
        }
    }
}

impl<T> From<InvocationFailure> for InvocationResult<T> {
    fn from(failure: InvocationFailure) -> Self {
        match failure {
            InvocationFailure::ExitFailure(code) => Self::ExitFailure(code),
            InvocationFailure::Error(err) => Self::Error(err),
        }
    }
}

impl<T: fmt::Display> fmt::Display for InvocationResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(value) => write!(f, "success: {value}"),
            Self::ExitFailure(code) => write!(f, "exit failure: {code}"),
            Self::Error(err) => write!(f, "error: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn spawn_error() -> InvocationError {
        InvocationError::Spawn {
            program: "elide".to_owned(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
    }

    #[test]
    fn map_transforms_success() {
        let result = InvocationResult::Success(2).map(|n| n * 21);
        assert!(matches!(result, InvocationResult::Success(42)));
    }

    #[rstest]
    #[case::exit(InvocationResult::ExitFailure(7))]
    #[case::error(InvocationResult::Error(spawn_error()))]
    fn failures_survive_success_transforms(#[case] result: InvocationResult<i32>) {
        let was_exit = result.exit_code();
        let mapped = result
            .map(|n| n + 1)
            .and_then(|n| InvocationResult::Success(n.to_string()));
        assert!(mapped.is_failure());
        assert_eq!(mapped.exit_code(), was_exit);
    }

    #[test]
    fn and_then_can_fail() {
        let result: InvocationResult<i32> =
            InvocationResult::Success(1).and_then(|_| InvocationResult::ExitFailure(4));
        assert_eq!(result.exit_code(), Some(4));
    }

    #[test]
    fn into_result_keeps_failure_kind() {
        let err = InvocationResult::<()>::Error(spawn_error())
            .into_result()
            .expect_err("error");
        assert!(matches!(err, InvocationFailure::Error(InvocationError::Spawn { .. })));
        assert!(err.to_string().contains("failed to start `elide`"));
    }

    #[test]
    fn get_success_or_else_returns_value() {
        let value = InvocationResult::Success("1.0.0".to_owned())
            .get_success_or_else(|_| panic!("not called"));
        assert_eq!(value, "1.0.0");
    }

    #[test]
    fn failure_round_trips_through_from() {
        let result: InvocationResult<()> = InvocationFailure::ExitFailure(9).into();
        assert_eq!(result.exit_code(), Some(9));
    }
}
