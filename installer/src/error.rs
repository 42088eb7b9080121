//! Error types for the Elide installer.
//!
//! This module defines semantic error variants that give actionable guidance
//! when the Elide binary cannot be resolved, downloaded, verified, or
//! prepared. Each fatal variant carries a remediation hint in its message.

use crate::artefact::download::DownloadError;
use crate::artefact::extraction::ExtractionError;
use crate::artefact::verification::VerificationError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving or installing the Elide binary.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// A download is implied by the resolution source but no version is set.
    #[error(
        "binary resolution source is `{source_kind}` but no version is set; \
         set `binary.version` in elide.toml or ELIDE_BIN_VERSION"
    )]
    MissingVersion {
        /// The resolution source that implied a download.
        source_kind: &'static str,
    },

    /// A version string was rejected by a configuration builder.
    #[error("invalid binary version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// The explicitly configured binary override cannot be used.
    #[error("explicit Elide binary {} {problem}; {hint}", path.display())]
    InvalidBinaryOverride {
        /// The configured override path.
        path: PathBuf,
        /// What is wrong with the path.
        problem: &'static str,
        /// Remediation text for the user.
        hint: String,
    },

    /// The host operating system or architecture has no Elide build.
    #[error("unsupported {kind} \"{value}\"; Elide ships for linux, darwin and windows on amd64/arm64")]
    UnsupportedPlatform {
        /// Either `"operating system"` or `"architecture"`.
        kind: &'static str,
        /// The raw value reported by the host.
        value: String,
    },

    /// Fetching the archive or signature bundle failed.
    #[error("failed to download the Elide binary: {0}")]
    Download(#[from] DownloadError),

    /// The signature bundle does not vouch for the downloaded archive.
    ///
    /// Both the archive and the bundle have already been deleted when this
    /// error is returned.
    #[error(
        "downloaded archive {} failed signature verification and was deleted: {source}",
        archive.display()
    )]
    VerificationFailed {
        /// Path of the rejected (now deleted) archive.
        archive: PathBuf,
        /// Why verification rejected the archive.
        #[source]
        source: VerificationError,
    },

    /// Unpacking the verified archive failed.
    #[error("failed to extract the Elide archive: {0}")]
    Extraction(#[from] ExtractionError),

    /// Extraction finished but produced no `elide` executable.
    #[error("installed archive did not contain {}; delete {} and run the install again", path.display(), dir.display())]
    BinaryMissingFromArchive {
        /// Expected binary location.
        path: PathBuf,
        /// Download directory to clear.
        dir: PathBuf,
    },

    /// The extracted binary could not be made executable.
    #[error("unable to make {} executable; try `sudo chmod +x {}` yourself", path.display(), path.display())]
    PermissionDenied {
        /// The binary that could not be updated.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_version_suggests_configuration_key() {
        let err = InstallerError::MissingVersion {
            source_kind: "project",
        };
        let msg = err.to_string();
        assert!(msg.contains("binary.version"));
        assert!(msg.contains("project"));
    }

    #[test]
    fn invalid_override_includes_hint() {
        let err = InstallerError::InvalidBinaryOverride {
            path: PathBuf::from("/opt/elide/elide"),
            problem: "is not executable",
            hint: "try `chmod +x /opt/elide/elide`".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/opt/elide/elide"));
        assert!(msg.contains("chmod +x"));
    }

    #[test]
    fn permission_denied_suggests_chmod() {
        let err = InstallerError::PermissionDenied {
            path: PathBuf::from("/tmp/elide"),
            source: std::io::Error::other("read-only file system"),
        };
        let msg = err.to_string();
        assert!(msg.contains("sudo chmod +x /tmp/elide"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn verification_failure_preserves_source() {
        let err = InstallerError::VerificationFailed {
            archive: PathBuf::from("/tmp/elide.zip"),
            source: VerificationError::DigestMismatch {
                expected: "aa".to_owned(),
                actual: "bb".to_owned(),
            },
        };
        assert!(err.to_string().contains("deleted"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn unsupported_platform_names_the_value() {
        let err = InstallerError::UnsupportedPlatform {
            kind: "architecture",
            value: "riscv64".to_owned(),
        };
        assert!(err.to_string().contains("riscv64"));
    }
}
