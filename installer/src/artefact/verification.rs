//! Signature verification for downloaded Elide archives.
//!
//! Every downloaded archive must be vouched for by its detached sigstore
//! bundle before it is unpacked. The check itself sits behind
//! [`SignatureVerifier`] so that the keyless `cosign` backend can be swapped
//! for an offline digest check or a test double.

use super::naming::ArtefactPair;
use crate::command::CommandExecutor;
use crate::error::{InstallerError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;

/// OIDC issuer of the GitHub Actions workflows that sign Elide releases.
const RELEASE_OIDC_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// Certificate identities accepted for Elide releases.
const RELEASE_IDENTITY_PATTERN: &str = "^https://github.com/elide-dev/";

/// Trait for checking an archive against its signature bundle.
#[cfg_attr(test, mockall::automock)]
pub trait SignatureVerifier {
    /// Verify `archive` against the sigstore `bundle`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] when the bundle does not vouch for the
    /// archive or the check could not be carried out.
    fn verify(&self, archive: &Path, bundle: &Path) -> std::result::Result<(), VerificationError>;
}

/// Reasons an archive is rejected.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The verifier ran and rejected the signature.
    #[error("signature rejected: {reason}")]
    Rejected {
        /// Output of the verifier.
        reason: String,
    },

    /// The digest recorded in the bundle differs from the archive's.
    #[error("digest mismatch: bundle records {expected}, archive hashes to {actual}")]
    DigestMismatch {
        /// Hex digest recorded in the bundle.
        expected: String,
        /// Hex digest of the archive on disk.
        actual: String,
    },

    /// The bundle could not be understood.
    #[error("malformed signature bundle: {reason}")]
    MalformedBundle {
        /// What was wrong with it.
        reason: String,
    },

    /// The archive arrived without a signature bundle.
    #[error("signature bundle {path} is missing")]
    MissingBundle {
        /// Where the bundle was expected.
        path: String,
    },

    /// The external verifier could not be started.
    #[error("could not run `{program}`: {source}; install cosign or configure another verifier")]
    VerifierUnavailable {
        /// Program that failed to start.
        program: String,
        /// Spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the archive or bundle failed.
    #[error("I/O error during verification: {0}")]
    Io(#[from] std::io::Error),
}

/// Gate an archive on its signature bundle.
///
/// On success only the bundle is deleted and the archive is left for
/// extraction. On failure both files are deleted before the error is
/// returned. An absent archive means extraction already consumed it and
/// nothing is checked.
///
/// # Errors
///
/// Returns [`InstallerError::VerificationFailed`] when the archive is
/// rejected, or [`InstallerError::Io`] when cleanup fails.
pub fn verify_artefacts(pair: &ArtefactPair, verifier: &dyn SignatureVerifier) -> Result<()> {
    if !pair.archive().exists() {
        debug!(target: "elide", "no archive to verify at {}", pair.archive().display());
        return Ok(());
    }

    let outcome = if pair.signature().is_file() {
        verifier.verify(pair.archive(), pair.signature())
    } else {
        Err(VerificationError::MissingBundle {
            path: pair.signature().display().to_string(),
        })
    };

    match outcome {
        Ok(()) => {
            info!(target: "elide", "verified {}", pair.archive().display());
            pair.remove_signature()?;
            Ok(())
        }
        Err(source) => {
            pair.remove_all()?;
            Err(InstallerError::VerificationFailed {
                archive: pair.archive().to_path_buf(),
                source,
            })
        }
    }
}

/// Keyless verification through the `cosign` CLI.
///
/// Runs `cosign verify-blob` against the public Sigstore trust root, pinning
/// the certificate identity to Elide's release workflows.
pub struct CosignVerifier<'a> {
    executor: &'a dyn CommandExecutor,
    program: String,
    identity_pattern: String,
    oidc_issuer: String,
}

impl<'a> CosignVerifier<'a> {
    /// Verifier pinned to Elide's release identity.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self {
            executor,
            program: "cosign".to_owned(),
            identity_pattern: RELEASE_IDENTITY_PATTERN.to_owned(),
            oidc_issuer: RELEASE_OIDC_ISSUER.to_owned(),
        }
    }

    /// Use a different `cosign` executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn arguments(&self, archive: &Path, bundle: &Path) -> Vec<String> {
        vec![
            "verify-blob".to_owned(),
            archive.display().to_string(),
            "--bundle".to_owned(),
            bundle.display().to_string(),
            "--new-bundle-format".to_owned(),
            "--certificate-identity-regexp".to_owned(),
            self.identity_pattern.clone(),
            "--certificate-oidc-issuer".to_owned(),
            self.oidc_issuer.clone(),
        ]
    }
}

impl SignatureVerifier for CosignVerifier<'_> {
    fn verify(&self, archive: &Path, bundle: &Path) -> std::result::Result<(), VerificationError> {
        let output = self
            .executor
            .run(&self.program, &self.arguments(archive, bundle))
            .map_err(|source| VerificationError::VerifierUnavailable {
                program: self.program.clone(),
                source,
            })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        Err(VerificationError::Rejected {
            reason: if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            },
        })
    }
}

/// Offline check that the bundle's recorded digest matches the archive.
///
/// This confirms the archive is the artefact the bundle was issued for. It
/// does not validate the certificate chain, so it is only as trustworthy as
/// the channel the bundle arrived over.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleDigestVerifier;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bundle {
    message_signature: Option<MessageSignature>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageSignature {
    message_digest: MessageDigest,
}

#[derive(Deserialize)]
struct MessageDigest {
    algorithm: String,
    digest: String,
}

impl SignatureVerifier for BundleDigestVerifier {
    fn verify(&self, archive: &Path, bundle: &Path) -> std::result::Result<(), VerificationError> {
        let raw = std::fs::read_to_string(bundle)?;
        let bundle: Bundle = serde_json::from_str(&raw).map_err(|e| {
            VerificationError::MalformedBundle {
                reason: e.to_string(),
            }
        })?;
        let digest = bundle
            .message_signature
            .ok_or_else(|| VerificationError::MalformedBundle {
                reason: "no messageSignature entry".to_owned(),
            })?
            .message_digest;
        if digest.algorithm != "SHA2_256" {
            return Err(VerificationError::MalformedBundle {
                reason: format!("unsupported digest algorithm {}", digest.algorithm),
            });
        }
        let expected = STANDARD.decode(digest.digest.as_bytes()).map_err(|e| {
            VerificationError::MalformedBundle {
                reason: format!("digest is not base64: {e}"),
            }
        })?;
        let actual = sha256_file(archive)?;
        if expected != actual {
            return Err(VerificationError::DigestMismatch {
                expected: to_hex(&expected),
                actual: to_hex(&actual),
            });
        }
        Ok(())
    }
}

fn sha256_file(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_vec())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
