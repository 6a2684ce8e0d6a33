//! Asynchronous `git` CLI runner.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::errors::GitError;

/// Captured result of a successful git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Runs version-control commands inside a working directory.
///
/// Implementations return `Ok` only for a zero exit status; anything else is
/// a [`GitError`].
#[allow(async_fn_in_trait)]
pub trait VcsRunner {
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<CommandOutput, GitError>;
}

/// [`VcsRunner`] backed by a real `git` binary.
#[derive(Debug, Clone)]
pub struct GitRunner {
    binary: String,
}

impl GitRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

impl VcsRunner for GitRunner {
    #[instrument(skip(self), fields(binary = %self.binary, dir = %dir.display()))]
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<CommandOutput, GitError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(dir)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = %command, "running git command");
        // A missing working directory also surfaces as NotFound.
        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound if dir.is_dir() => {
                GitError::BinaryNotFound(self.binary.clone())
            }
            _ => GitError::Spawn {
                command: command.clone(),
                source: e,
            },
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if !output.status.success() {
            warn!(exit_code, %stderr, "git command failed");
            return Err(GitError::CommandFailed {
                command,
                exit_code,
                stderr,
            });
        }
        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

/// Parse `git diff --name-only` output into paths, dropping blank lines.
pub fn parse_name_only(stdout: &str) -> impl Iterator<Item = &str> {
    stdout.lines().map(str::trim).filter(|l| !l.is_empty())
}
