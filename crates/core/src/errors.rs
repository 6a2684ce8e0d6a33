//! Error types for the clobbercheck core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and
//! [`DetectError`] unifies the two that can abort a detection run.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Error returned by a detection run.
///
/// There is no recovery path: the first failure from either collaborator
/// ends the run and is surfaced here unchanged.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from running the `git` CLI.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// The process could not be started or awaited.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A git command exited with a non-zero status.
    #[error("git command failed: {command} (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// `git merge-base` succeeded but printed no commit.
    #[error("no merge-base between '{feature}' and '{target}'")]
    NoMergeBase { feature: String, target: String },
}

// ---------------------------------------------------------------------------
// GitHub API errors
// ---------------------------------------------------------------------------

/// Errors from the GitHub REST history API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP-level transport error (network, TLS, timeout, client setup).
    #[error("GitHub HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a status code of 400 or above.
    #[error("GitHub API error (HTTP {status}) for {url}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    /// A base or continuation URL could not be parsed.
    #[error("invalid GitHub URL '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },

    /// The response body did not match the expected shape.
    #[error("GitHub response parse error for {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A commit record lacked the author timestamp needed to bound history.
    #[error("commit {sha} has no author date")]
    MissingAuthorDate { sha: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
