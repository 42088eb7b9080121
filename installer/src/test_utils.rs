//! Shared test utilities for the installer crate.
//!
//! Available to this crate's tests and, through the `test-support` feature,
//! to the `elide-build` test suites.

use crate::artefact::download::{ArtefactDownloader, DownloadError};
use crate::artefact::verification::{SignatureVerifier, VerificationError};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Shell script that behaves like a minimal `elide` binary.
///
/// `--version` prints `version`; `fail` exits with status 3 after writing to
/// stderr; anything else echoes each argument on its own line.
pub fn fake_elide_script(version: &str) -> String {
    format!(
        "#!/bin/sh\n\
         case \"$1\" in\n\
         \x20 --version) echo \"{version}\" ;;\n\
         \x20 fail) echo \"boom\" >&2; exit 3 ;;\n\
         \x20 *) for arg in \"$@\"; do echo \"$arg\"; done ;;\n\
         esac\n"
    )
}

/// Write [`fake_elide_script`] as an executable `elide` inside `dir`.
///
/// # Panics
///
/// Panics if the directory or file cannot be written.
#[cfg(unix)]
pub fn write_fake_elide(dir: &Path, version: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    std::fs::create_dir_all(dir).expect("create binary directory");
    let path = dir.join("elide");
    std::fs::write(&path, fake_elide_script(version)).expect("write fake elide");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("mark fake elide executable");
    path
}

/// Build a zip archive in memory from `(name, contents)` pairs.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
    for (name, contents) in entries {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(contents).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Minimal sigstore bundle whose message digest matches `archive`.
pub fn sigstore_bundle_json(archive: &[u8]) -> String {
    let digest = STANDARD.encode(Sha256::digest(archive));
    serde_json::json!({
        "mediaType": "application/vnd.dev.sigstore.bundle.v0.3+json",
        "verificationMaterial": {},
        "messageSignature": {
            "messageDigest": { "algorithm": "SHA2_256", "digest": digest },
            "signature": "MEUCIQ=="
        }
    })
    .to_string()
}

/// Downloader serving one archive and a matching signature bundle.
///
/// URLs ending in `.sigstore` receive the bundle; everything else receives
/// the archive. Requested URLs are recorded in order.
#[derive(Debug)]
pub struct StubDownloader {
    archive: Vec<u8>,
    bundle: String,
    requests: Mutex<Vec<String>>,
}

impl StubDownloader {
    /// Serve `archive` with a bundle computed from it.
    pub fn serving(archive: Vec<u8>) -> Self {
        let bundle = sigstore_bundle_json(&archive);
        Self {
            archive,
            bundle,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Serve `bundle` instead of the matching one.
    pub fn with_bundle(mut self, bundle: String) -> Self {
        self.bundle = bundle;
        self
    }

    /// URLs fetched so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl ArtefactDownloader for StubDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_owned());
        }
        if url.ends_with(".sigstore") {
            std::fs::write(dest, &self.bundle)?;
        } else {
            std::fs::write(dest, &self.archive)?;
        }
        Ok(())
    }
}

/// Verifier with a fixed verdict that counts its calls.
#[derive(Debug)]
pub struct StubVerifier {
    accept: bool,
    calls: AtomicUsize,
}

impl StubVerifier {
    /// Accept every archive.
    pub fn accepting() -> Self {
        Self {
            accept: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reject every archive.
    pub fn rejecting() -> Self {
        Self {
            accept: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of verifications performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SignatureVerifier for StubVerifier {
    fn verify(&self, _archive: &Path, _bundle: &Path) -> Result<(), VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.accept {
            Ok(())
        } else {
            Err(VerificationError::Rejected {
                reason: "stub verifier rejects everything".to_owned(),
            })
        }
    }
}
