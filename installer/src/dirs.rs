//! Directory resolution abstraction for platform-specific paths.

use std::path::PathBuf;

/// Source of per-user directories, replaceable in tests.
pub trait BaseDirs {
    /// The user's home directory.
    fn home_dir(&self) -> Option<PathBuf>;

    /// The conventional per-user Elide install, `${HOME}/elide`.
    fn elide_home(&self) -> Option<PathBuf> {
        self.home_dir().map(|home| home.join("elide"))
    }
}

/// [`BaseDirs`] backed by the host's directory conventions.
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    inner: directories_next::BaseDirs,
}

impl SystemBaseDirs {
    /// Look up the current user's directories.
    ///
    /// Returns `None` when no home directory can be determined.
    #[must_use]
    pub fn new() -> Option<Self> {
        directories_next::BaseDirs::new().map(|inner| Self { inner })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        Some(self.inner.home_dir().to_path_buf())
    }
}
