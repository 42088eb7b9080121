//! Discovery of an Elide binary that is already installed.
//!
//! Candidates are tried in a fixed order and the first usable one wins:
//!
//! 1. an explicit override, which must be valid when given;
//! 2. `<dir>/elide` for each entry of the search path;
//! 3. `${HOME}/elide/elide`.
//!
//! Finding nothing is not an error; callers decide whether to download.

use crate::dirs::{BaseDirs, SystemBaseDirs};
use crate::error::{InstallerError, Result};
use crate::permissions::is_executable;
use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Literal name of the Elide executable, without any platform suffix.
pub const BINARY_NAME: &str = "elide";

/// File name of the Elide executable on this host.
#[must_use]
pub fn binary_file_name() -> String {
    format!("{BINARY_NAME}{}", std::env::consts::EXE_SUFFIX)
}

/// Where a local binary was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalOrigin {
    /// The explicitly configured path.
    Override,
    /// An entry of the search path.
    SearchPath,
    /// The per-user install under the home directory.
    Home,
}

/// A binary found on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedBinary {
    /// Path to the executable.
    pub path: PathBuf,
    /// Which strategy found it.
    pub origin: LocalOrigin,
}

/// Searches the host for an installed Elide binary.
///
/// # Examples
///
/// ```no_run
/// use elide_installer::locator::LocalBinaryLocator;
///
/// let locator = LocalBinaryLocator::from_environment(None);
/// if let Some(found) = locator.resolve()? {
///     println!("using {}", found.path.display());
/// }
/// # Ok::<(), elide_installer::error::InstallerError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalBinaryLocator {
    explicit: Option<PathBuf>,
    search_path: Option<OsString>,
    home_install: Option<PathBuf>,
}

impl LocalBinaryLocator {
    /// Build a locator from explicit inputs.
    #[must_use]
    pub fn new(
        explicit: Option<PathBuf>,
        search_path: Option<OsString>,
        dirs: &dyn BaseDirs,
    ) -> Self {
        Self {
            explicit,
            search_path,
            home_install: dirs.elide_home().map(|dir| dir.join(binary_file_name())),
        }
    }

    /// Build a locator from the process `PATH` and the user's home.
    #[must_use]
    pub fn from_environment(explicit: Option<PathBuf>) -> Self {
        let search_path = std::env::var_os("PATH");
        match SystemBaseDirs::new() {
            Some(dirs) => Self::new(explicit, search_path, &dirs),
            None => Self {
                explicit,
                search_path,
                home_install: None,
            },
        }
    }

    /// Use `path` as the override unless one is already set.
    #[must_use]
    pub fn or_override(mut self, path: PathBuf) -> Self {
        if self.explicit.is_none() {
            self.explicit = Some(path);
        }
        self
    }

    /// The configured override, if any.
    #[must_use]
    pub fn explicit(&self) -> Option<&Path> {
        self.explicit.as_deref()
    }

    /// Find the first usable binary.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidBinaryOverride`] when an override is
    /// configured but missing, a directory, or not executable. An invalid
    /// override never falls through to the other strategies.
    pub fn resolve(&self) -> Result<Option<LocatedBinary>> {
        if let Some(path) = &self.explicit {
            validate_override(path)?;
            debug!(target: "elide", "using explicit Elide binary {}", path.display());
            return Ok(Some(LocatedBinary {
                path: path.clone(),
                origin: LocalOrigin::Override,
            }));
        }

        if let Some(path) = self.search_path_candidate() {
            return Ok(Some(LocatedBinary {
                path,
                origin: LocalOrigin::SearchPath,
            }));
        }

        if let Some(path) = self
            .home_install
            .as_ref()
            .filter(|candidate| usable(candidate))
        {
            debug!(target: "elide", "found Elide binary in home directory: {}", path.display());
            return Ok(Some(LocatedBinary {
                path: path.clone(),
                origin: LocalOrigin::Home,
            }));
        }

        debug!(target: "elide", "no local Elide binary found");
        Ok(None)
    }

    fn search_path_candidate(&self) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        let name = binary_file_name();
        std::env::split_paths(search_path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.join(&name))
            .find(|candidate| usable(candidate))
    }
}

/// Check a candidate, logging matches that exist but cannot be run.
fn usable(candidate: &Path) -> bool {
    if !candidate.is_file() {
        return false;
    }
    if is_executable(candidate) {
        return true;
    }
    info!(
        target: "elide",
        "{} exists but is not executable; skipping it",
        candidate.display()
    );
    false
}

fn validate_override(path: &Path) -> Result<()> {
    let invalid = |problem: &'static str, hint: String| InstallerError::InvalidBinaryOverride {
        path: path.to_path_buf(),
        problem,
        hint,
    };
    if !path.exists() {
        return Err(invalid(
            "does not exist",
            "point ELIDE_BIN_PATH or `binary.path` at an installed elide binary".to_owned(),
        ));
    }
    if path.is_dir() {
        return Err(invalid(
            "is a directory",
            format!("point it at the binary itself, e.g. {}", path.join(BINARY_NAME).display()),
        ));
    }
    if !is_executable(path) {
        return Err(invalid(
            "is not executable",
            format!("try `chmod +x {}`", path.display()),
        ));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::write_fake_elide;
    use rstest::{fixture, rstest};
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    struct TestDirs(Option<PathBuf>);

    impl BaseDirs for TestDirs {
        fn home_dir(&self) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    struct Host {
        root: TempDir,
    }

    impl Host {
        fn dir(&self, name: &str) -> PathBuf {
            let dir = self.root.path().join(name);
            std::fs::create_dir_all(&dir).expect("create dir");
            dir
        }

        fn home(&self) -> PathBuf {
            self.dir("home")
        }

        fn locator(&self, explicit: Option<PathBuf>, path_dirs: &[PathBuf]) -> LocalBinaryLocator {
            let search_path = std::env::join_paths(path_dirs).expect("join paths");
            LocalBinaryLocator::new(explicit, Some(search_path), &TestDirs(Some(self.home())))
        }
    }

    #[fixture]
    fn host() -> Host {
        Host {
            root: TempDir::new().expect("temp dir"),
        }
    }

    #[rstest]
    fn explicit_override_wins(host: Host) {
        let explicit = write_fake_elide(&host.dir("explicit"), "1.0.0");
        let on_path = host.dir("path");
        write_fake_elide(&on_path, "2.0.0");
        write_fake_elide(&host.home().join("elide"), "3.0.0");

        let found = host
            .locator(Some(explicit.clone()), &[on_path])
            .resolve()
            .expect("resolve")
            .expect("binary");

        assert_eq!(found.path, explicit);
        assert_eq!(found.origin, LocalOrigin::Override);
    }

    #[rstest]
    fn search_path_beats_home(host: Host) {
        let on_path = host.dir("path");
        let expected = write_fake_elide(&on_path, "2.0.0");
        write_fake_elide(&host.home().join("elide"), "3.0.0");

        let found = host
            .locator(None, &[host.dir("empty"), on_path])
            .resolve()
            .expect("resolve")
            .expect("binary");

        assert_eq!(found.path, expected);
        assert_eq!(found.origin, LocalOrigin::SearchPath);
    }

    #[rstest]
    fn home_install_is_the_last_resort(host: Host) {
        let expected = write_fake_elide(&host.home().join("elide"), "3.0.0");

        let found = host
            .locator(None, &[host.dir("empty")])
            .resolve()
            .expect("resolve")
            .expect("binary");

        assert_eq!(found.path, expected);
        assert_eq!(found.origin, LocalOrigin::Home);
    }

    #[rstest]
    fn non_executable_candidates_are_logged_and_skipped(host: Host) {
        let on_path = host.dir("path");
        let candidate = write_fake_elide(&on_path, "2.0.0");
        std::fs::set_permissions(&candidate, std::fs::Permissions::from_mode(0o644))
            .expect("chmod");
        let logger = logtest::Logger::start();

        let found = host.locator(None, &[on_path]).resolve().expect("resolve");

        assert!(found.is_none());
        let logged = logger
            .into_iter()
            .any(|record| record.level() == log::Level::Info && record.args().contains("not executable"));
        assert!(logged, "expected an info record for the skipped candidate");
    }

    #[rstest]
    fn nothing_found_is_not_an_error(host: Host) {
        let found = host.locator(None, &[host.dir("empty")]).resolve().expect("resolve");
        assert!(found.is_none());
    }

    #[rstest]
    #[case::missing("missing", "does not exist")]
    #[case::directory("dir", "is a directory")]
    #[case::not_executable("plain", "is not executable")]
    fn invalid_override_is_fatal(host: Host, #[case] kind: &str, #[case] problem: &str) {
        let on_path = host.dir("path");
        write_fake_elide(&on_path, "2.0.0");
        let explicit = match kind {
            "missing" => host.root.path().join("nope/elide"),
            "dir" => host.dir("dir"),
            _ => {
                let path = write_fake_elide(&host.dir("plain"), "1.0.0");
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))
                    .expect("chmod");
                path
            }
        };

        let err = host
            .locator(Some(explicit), &[on_path])
            .resolve()
            .expect_err("invalid override");

        assert!(err.to_string().contains(problem), "{err}");
    }

    #[rstest]
    fn or_override_keeps_existing_override(host: Host) {
        let first = write_fake_elide(&host.dir("first"), "1.0.0");
        let locator = host
            .locator(Some(first.clone()), &[])
            .or_override(PathBuf::from("/elsewhere/elide"));
        assert_eq!(locator.explicit(), Some(first.as_path()));
    }
}
