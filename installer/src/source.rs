//! Binary resolution policy and the configuration that carries it.
//!
//! A [`ResolutionSource`] is chosen once per build and governs every later
//! decision: whether local installs are consulted, whether a download may
//! happen, and whether strict version checks apply.

use crate::error::{InstallerError, Result};
use std::path::{Path, PathBuf};

/// How the Elide binary is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Only use a binary already installed on this machine.
    ///
    /// When `path` is set it names the directory holding the binary and is
    /// used instead of searching `PATH` and the home directory.
    LocalOnly {
        /// Optional directory containing the `elide` binary.
        path: Option<PathBuf>,
    },
    /// Prefer a local binary, downloading the configured version otherwise.
    LocalIfApplicable {
        /// Where a downloaded binary should live.
        download_path: Option<PathBuf>,
    },
    /// Always download a project-scoped binary and ignore local installs.
    Project {
        /// Where the downloaded binary should live.
        download_path: Option<PathBuf>,
    },
}

impl ResolutionSource {
    /// Short, stable name used in messages and configuration files.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LocalOnly { .. } => "local-only",
            Self::LocalIfApplicable { .. } => "local-if-applicable",
            Self::Project { .. } => "project",
        }
    }

    /// Whether local installs are consulted at all.
    #[must_use]
    pub const fn is_local_based(&self) -> bool {
        matches!(self, Self::LocalOnly { .. } | Self::LocalIfApplicable { .. })
    }

    /// Whether this policy may end in a download.
    #[must_use]
    pub const fn may_download(&self) -> bool {
        !matches!(self, Self::LocalOnly { .. })
    }

    /// The explicit download directory, if one was configured.
    #[must_use]
    pub fn download_path(&self) -> Option<&Path> {
        match self {
            Self::LocalOnly { .. } => None,
            Self::LocalIfApplicable { download_path } | Self::Project { download_path } => {
                download_path.as_deref()
            }
        }
    }
}

impl Default for ResolutionSource {
    fn default() -> Self {
        Self::LocalOnly { path: None }
    }
}

/// Everything the installer needs to know about which binary to use.
///
/// # Examples
///
/// ```
/// use elide_installer::source::{BinaryConfiguration, ResolutionSource};
///
/// let mut config = BinaryConfiguration::default();
/// config.use_project_binary("1.0.0", None).expect("valid version");
/// assert_eq!(config.required_version().expect("version set"), "1.0.0");
/// assert!(matches!(config.source(), ResolutionSource::Project { .. }));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryConfiguration {
    source: ResolutionSource,
    version: Option<String>,
    strict_version_check: bool,
    silent_mode: bool,
}

impl BinaryConfiguration {
    /// Assemble a configuration from already-loaded values.
    #[must_use]
    pub fn new(
        source: ResolutionSource,
        version: Option<String>,
        strict_version_check: bool,
        silent_mode: bool,
    ) -> Self {
        Self {
            source,
            version,
            strict_version_check,
            silent_mode,
        }
    }

    /// Use only a locally installed binary, optionally from `path`.
    ///
    /// Clears any required version.
    pub fn use_local_only(&mut self, path: Option<PathBuf>) {
        self.version = None;
        self.source = ResolutionSource::LocalOnly { path };
    }

    /// Prefer a local binary and fall back to downloading `version`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidVersion`] for blank or `latest`
    /// versions.
    pub fn use_local_if_applicable(
        &mut self,
        version: &str,
        strict_version_check: bool,
        download_path: Option<PathBuf>,
    ) -> Result<()> {
        validate_pinned_version(version)?;
        self.strict_version_check = strict_version_check;
        self.version = Some(version.to_owned());
        self.source = ResolutionSource::LocalIfApplicable { download_path };
        Ok(())
    }

    /// Always download and use `version` inside the project.
    ///
    /// Strict version checking does not apply to project binaries and is
    /// switched off.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidVersion`] for blank or `latest`
    /// versions.
    pub fn use_project_binary(&mut self, version: &str, download_path: Option<PathBuf>) -> Result<()> {
        validate_pinned_version(version)?;
        self.strict_version_check = false;
        self.version = Some(version.to_owned());
        self.source = ResolutionSource::Project { download_path };
        Ok(())
    }

    /// Suppress hard failures when no binary can be found.
    pub fn set_silent_mode(&mut self, silent_mode: bool) {
        self.silent_mode = silent_mode;
    }

    /// Require the resolved binary to report exactly the configured version.
    pub fn set_strict_version_check(&mut self, strict: bool) {
        self.strict_version_check = strict;
    }

    /// Override the required version without changing the source.
    pub fn set_version(&mut self, version: Option<String>) {
        self.version = version;
    }

    /// The active resolution policy.
    #[must_use]
    pub fn source(&self) -> &ResolutionSource {
        &self.source
    }

    /// The configured version, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The version a download needs.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::MissingVersion`] when the source may
    /// download but no version is configured.
    pub fn required_version(&self) -> Result<&str> {
        self.version
            .as_deref()
            .ok_or(InstallerError::MissingVersion {
                source_kind: self.source.kind(),
            })
    }

    /// Whether strict version checking was requested.
    #[must_use]
    pub const fn strict_version_check(&self) -> bool {
        self.strict_version_check
    }

    /// Whether a missing binary should be tolerated.
    #[must_use]
    pub const fn silent_mode(&self) -> bool {
        self.silent_mode
    }
}

fn validate_pinned_version(version: &str) -> Result<()> {
    if version.trim().is_empty() {
        return Err(InstallerError::InvalidVersion {
            value: version.to_owned(),
            reason: "a blank version cannot be downloaded",
        });
    }
    if version == "latest" {
        return Err(InstallerError::InvalidVersion {
            value: version.to_owned(),
            reason: "`latest` is not a pinned version",
        });
    }
    Ok(())
}
