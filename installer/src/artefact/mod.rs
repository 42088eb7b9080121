//! Release artefacts for the Elide CLI: naming, download, verification and
//! extraction.
//!
//! # Sub-modules
//!
//! - [`naming`] — Deterministic on-disk names (`ArtefactPair`).
//! - [`download`] — Endpoint layout, download trait and HTTP implementation.
//! - [`verification`] — Signature verification seam and its backends.
//! - [`extraction`] — Zip extraction with path traversal protection.

pub mod download;
pub mod extraction;
pub mod naming;
pub mod verification;
