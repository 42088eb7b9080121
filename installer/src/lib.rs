//! Elide installer library.
//!
//! Decides which Elide CLI binary a build uses and, when none is installed,
//! downloads, verifies and prepares one. The `elide-build` crate drives this
//! library; it can also be used on its own to provision a binary.
//!
//! # Modules
//!
//! - [`artefact`] - Release archive naming, download, verification and extraction
//! - [`command`] - External command execution seam
//! - [`dirs`] - Directory resolution abstraction for per-user paths
//! - [`error`] - Semantic error types with remediation hints
//! - [`locator`] - Search for a locally installed binary
//! - [`permissions`] - Executable-bit handling
//! - [`pipeline`] - Download, verify, extract and prepare in order
//! - [`platform`] - Host OS and architecture classification
//! - [`resolution`] - Binary path resolution and runtime layout
//! - [`source`] - Resolution policy and binary configuration

pub mod artefact;
pub mod command;
pub mod dirs;
pub mod error;
pub mod locator;
pub mod permissions;
pub mod pipeline;
pub mod platform;
pub mod resolution;
pub mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
