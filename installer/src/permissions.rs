//! Executable-bit handling for installed binaries.
//!
//! On POSIX hosts a freshly extracted binary usually lacks the executable
//! bit, so it is set to `rwxr-xr-x`. Windows has no such bit and the step is
//! skipped there entirely.

use crate::error::{InstallerError, Result};
use log::debug;
use std::path::Path;

/// Mode applied to extracted binaries (owner rwx, group and others r-x).
#[cfg(unix)]
const BINARY_MODE: u32 = 0o755;

/// What [`make_executable`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// The binary already carried an executable bit.
    AlreadyExecutable,
    /// The mode was updated.
    Updated,
    /// The host has no executable bit to set.
    Skipped,
}

/// Report whether `path` is a regular file this process may execute.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    has_exec_bit(&metadata)
}

#[cfg(unix)]
fn has_exec_bit(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_exec_bit(_metadata: &std::fs::Metadata) -> bool {
    true
}

/// Ensure the binary at `path` can be executed.
///
/// # Errors
///
/// Returns [`InstallerError::PermissionDenied`], whose message includes the
/// `chmod` command to run by hand, when the mode cannot be changed.
pub fn make_executable(path: &Path) -> Result<PermissionOutcome> {
    if is_executable(path) && cfg!(unix) {
        debug!(target: "elide", "{} is already executable", path.display());
        return Ok(PermissionOutcome::AlreadyExecutable);
    }
    set_binary_mode(path)
}

#[cfg(unix)]
fn set_binary_mode(path: &Path) -> Result<PermissionOutcome> {
    use std::os::unix::fs::PermissionsExt;

    let permission_error = |source| InstallerError::PermissionDenied {
        path: path.to_path_buf(),
        source,
    };
    let mut perms = std::fs::metadata(path)
        .map_err(permission_error)?
        .permissions();
    perms.set_mode(BINARY_MODE);
    std::fs::set_permissions(path, perms).map_err(permission_error)?;
    debug!(target: "elide", "marked {} as executable", path.display());
    Ok(PermissionOutcome::Updated)
}

#[cfg(not(unix))]
fn set_binary_mode(path: &Path) -> Result<PermissionOutcome> {
    debug!(target: "elide", "skipping executable bit for {} on this host", path.display());
    Ok(PermissionOutcome::Skipped)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, mode: u32) -> std::path::PathBuf {
        let path = dir.path().join("elide");
        std::fs::write(&path, "#!/bin/sh\n").expect("write binary");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .expect("set mode");
        path
    }

    #[test]
    fn sets_expected_mode() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_file(&dir, 0o644);

        let outcome = make_executable(&path).expect("make executable");

        assert_eq!(outcome, PermissionOutcome::Updated);
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn second_application_is_a_no_op() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_file(&dir, 0o600);

        assert_eq!(
            make_executable(&path).expect("first"),
            PermissionOutcome::Updated
        );
        assert_eq!(
            make_executable(&path).expect("second"),
            PermissionOutcome::AlreadyExecutable
        );
    }

    #[test]
    fn missing_binary_reports_chmod_hint() {
        let dir = TempDir::new().expect("temp dir");
        let err = make_executable(&dir.path().join("absent")).expect_err("missing file");
        assert!(err.to_string().contains("chmod +x"));
    }

    #[test]
    fn directories_are_not_executables() {
        let dir = TempDir::new().expect("temp dir");
        assert!(!is_executable(dir.path()));
    }
}
