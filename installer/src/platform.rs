//! Host platform classification for selecting Elide release artefacts.
//!
//! Elide publishes one archive per operating system and CPU architecture,
//! addressed by a tag such as `linux-amd64` or `darwin-aarch64`. Only the
//! combinations below are accepted; anything else is a configuration error
//! rather than something worth retrying.

use crate::error::{InstallerError, Result};
use std::fmt;

/// Operating systems with published Elide builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// Linux distributions.
    Linux,
    /// macOS.
    Darwin,
    /// Windows.
    Windows,
}

impl Os {
    /// Return the tag prefix used in artefact URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }
}

/// CPU architectures with published Elide builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit x86.
    Amd64,
    /// 64-bit ARM.
    Aarch64,
}

impl Arch {
    /// Return the tag suffix used in artefact URLs.
    ///
    /// 64-bit ARM is always spelled `aarch64`, whichever alias the host
    /// reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Aarch64 => "aarch64",
        }
    }
}

/// A validated `<os>-<arch>` tag identifying one Elide release artefact.
///
/// # Examples
///
/// ```
/// use elide_installer::platform::PlatformTag;
///
/// let tag = PlatformTag::classify("Mac OS X", "arm64").expect("supported");
/// assert_eq!(tag.to_string(), "darwin-aarch64");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformTag {
    os: Os,
    arch: Arch,
}

impl PlatformTag {
    /// Construct a tag from already-validated parts.
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Classify the platform this process is running on.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnsupportedPlatform`] when the host has no
    /// published Elide build.
    pub fn host() -> Result<Self> {
        Self::classify(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Classify raw OS and architecture names.
    ///
    /// OS names are matched case-insensitively by substring so that both
    /// Rust's `macos` and the JVM-style `Mac OS X` map to `darwin`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnsupportedPlatform`] for unknown values.
    pub fn classify(os: &str, arch: &str) -> Result<Self> {
        Ok(Self {
            os: classify_os(os)?,
            arch: classify_arch(arch)?,
        })
    }

    /// The operating system half of the tag.
    #[must_use]
    pub const fn os(&self) -> Os {
        self.os
    }

    /// The architecture half of the tag.
    #[must_use]
    pub const fn arch(&self) -> Arch {
        self.arch
    }

    /// Whether the tag names a Windows build.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

fn classify_os(raw: &str) -> Result<Os> {
    let lowered = raw.to_lowercase();
    if lowered.contains("linux") {
        Ok(Os::Linux)
    } else if lowered.contains("mac os x") || lowered.contains("macos") || lowered.contains("darwin")
    {
        Ok(Os::Darwin)
    } else if lowered.contains("windows") {
        Ok(Os::Windows)
    } else {
        Err(InstallerError::UnsupportedPlatform {
            kind: "operating system",
            value: raw.to_owned(),
        })
    }
}

fn classify_arch(raw: &str) -> Result<Arch> {
    match raw.to_lowercase().as_str() {
        "x86_64" | "amd64" => Ok(Arch::Amd64),
        "arm64" | "aarch64" => Ok(Arch::Aarch64),
        _ => Err(InstallerError::UnsupportedPlatform {
            kind: "architecture",
            value: raw.to_owned(),
        }),
    }
}
