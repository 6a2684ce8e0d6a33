//! clobbercheck core library.
//!
//! Finds files modified on a feature branch that were also modified upstream,
//! on the branch it targets, after the two diverged. This crate provides the
//! configuration, the `git` runner, the GitHub history client with its
//! request builder and pagination, and the detector that ties them together.

pub mod config;
pub mod detector;
pub mod errors;
pub mod git;
pub mod github;

// Re-exports for convenience.
pub use config::AppConfig;
pub use detector::{DetectionReport, FileChangesDetector};
pub use errors::DetectError;
