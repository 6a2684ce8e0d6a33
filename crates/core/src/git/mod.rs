//! Local git operations for clobbercheck.

pub mod runner;

pub use runner::{CommandOutput, GitRunner, VcsRunner};
