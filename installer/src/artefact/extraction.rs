//! Archive extraction for downloaded Elide releases.
//!
//! Extracts `.zip` archives into the download directory with path traversal
//! protection to prevent zip-slip attacks, then removes the archive.

use super::naming::{ArtefactPair, remove_if_present};
use log::{debug, info};
use std::path::{Component, Path};

/// Trait for extracting artefact archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the relative paths of the extracted files.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::EmptyArchive`] if no files are found.
    /// Returns [`ExtractionError::Io`] or [`ExtractionError::Zip`] on
    /// read failures.
    fn extract(&self, archive_path: &Path, dest_dir: &Path)
    -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive could not be read as a zip file.
    #[error("corrupt archive: {0}; delete it and run the install again")]
    Zip(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Default extractor built on the `zip` crate.
///
/// Validates each entry path before writing anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ArtefactExtractor for ZipExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<String>, ExtractionError> {
        let file = std::fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut extracted = Vec::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let entry_path = Path::new(entry.name()).to_path_buf();
            validate_entry_path(&entry_path)?;

            let dest_path = dest_dir.join(&entry_path);
            if entry.is_dir() {
                std::fs::create_dir_all(&dest_path)?;
                continue;
            }
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = std::fs::File::create(&dest_path)?;
            std::io::copy(&mut entry, &mut out)?;
            apply_entry_mode(&dest_path, entry.unix_mode())?;
            extracted.push(entry_path.to_string_lossy().into_owned());
        }

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }

        Ok(extracted)
    }
}

#[cfg(unix)]
fn apply_entry_mode(path: &Path, mode: Option<u32>) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        Some(mode) => std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o777)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_entry_mode(_path: &Path, _mode: Option<u32>) -> std::io::Result<()> {
    Ok(())
}

/// Unpack a verified archive into `dest_dir` and delete it.
///
/// Returns `None` without touching anything when the archive is absent,
/// which is the case on every run after the first successful extraction.
///
/// # Errors
///
/// Returns [`ExtractionError`] when unpacking or the archive cleanup fails.
pub fn extract_archive(
    pair: &ArtefactPair,
    dest_dir: &Path,
    extractor: &dyn ArtefactExtractor,
) -> Result<Option<Vec<String>>, ExtractionError> {
    if !pair.archive().exists() {
        debug!(
            target: "elide",
            "no archive at {}; skipping extraction",
            pair.archive().display()
        );
        return Ok(None);
    }
    let files = extractor.extract(pair.archive(), dest_dir)?;
    info!(
        target: "elide",
        "extracted {} file(s) into {}",
        files.len(),
        dest_dir.display()
    );
    remove_if_present(pair.archive())?;
    remove_if_present(pair.signature())?;
    Ok(Some(files))
}

/// Validate that an entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
