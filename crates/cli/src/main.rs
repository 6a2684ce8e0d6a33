//! clobbercheck command-line tool.
//!
//! Reports the files changed on a feature branch that were also modified on
//! the target branch after the two diverged. Intended to run in CI before a
//! merge so that silently clobbered upstream edits get flagged.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use clobbercheck_core::config::AppConfig;
use clobbercheck_core::detector::{DetectionReport, FileChangesDetector};

/// Exit status when `--fail-on-overlap` is set and overlaps were found.
const EXIT_OVERLAP: u8 = 2;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Flag files modified locally that were also modified upstream since the
/// merge-base.
#[derive(Parser, Debug)]
#[command(name = "clobbercheck", version, about)]
struct Cli {
    /// Repository owner (user or organization).
    #[arg(required_unless_present = "print_default_config")]
    owner: Option<String>,

    /// Repository name.
    #[arg(required_unless_present = "print_default_config")]
    repo: Option<String>,

    /// Path to the local clone.
    #[arg(required_unless_present = "print_default_config")]
    local_path: Option<PathBuf>,

    /// Branch the feature branch will merge into (e.g. `main`).
    #[arg(required_unless_present = "print_default_config")]
    target_branch: Option<String>,

    /// Local feature branch.
    #[arg(required_unless_present = "print_default_config")]
    feature_branch: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// GitHub API base URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Environment variable holding the GitHub token.
    #[arg(long)]
    token_env: Option<String>,

    /// Page size for the upstream commit listing (1-100).
    #[arg(long)]
    per_page: Option<u32>,

    /// Remote that carries the target branch.
    #[arg(long)]
    remote: Option<String>,

    /// Git executable to run.
    #[arg(long = "git")]
    git_binary: Option<String>,

    /// Print the full detection report as JSON.
    #[arg(long)]
    json: bool,

    /// Exit with status 2 when any overlapping file is found.
    #[arg(long)]
    fail_on_overlap: bool,

    /// Print a default configuration file and exit.
    #[arg(long)]
    print_default_config: bool,
}

/// Positional arguments once presence has been checked.
struct Target {
    owner: String,
    repo: String,
    local_path: PathBuf,
    target_branch: String,
    feature_branch: String,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", AppConfig::default_toml());
        return ExitCode::SUCCESS;
    }

    let config = match layered_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    // Env resolution logs, so it runs after the subscriber is installed.
    init_logging(&config.log.level);
    let config = match resolve_config(config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, config).await {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(EXIT_OVERLAP),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries only the result.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns `true` when the run should exit with [`EXIT_OVERLAP`].
async fn run(cli: Cli, config: AppConfig) -> Result<bool> {
    let json = cli.json;
    let fail_on_overlap = cli.fail_on_overlap;
    let target = positional(cli)?;

    let detector =
        FileChangesDetector::from_config(&config).context("failed to create GitHub client")?;
    info!(
        owner = %target.owner,
        repo = %target.repo,
        target = %target.target_branch,
        feature = %target.feature_branch,
        "checking for upstream overlap"
    );
    let report = detector
        .detect_report(
            &target.owner,
            &target.repo,
            &target.local_path,
            &target.target_branch,
            &target.feature_branch,
        )
        .await
        .context("upstream overlap detection failed")?;

    print_report(&report, json)?;

    Ok(fail_on_overlap && !report.independently_modified.is_empty())
}

fn positional(cli: Cli) -> Result<Target> {
    let (Some(owner), Some(repo), Some(local_path), Some(target_branch), Some(feature_branch)) = (
        cli.owner,
        cli.repo,
        cli.local_path,
        cli.target_branch,
        cli.feature_branch,
    ) else {
        anyhow::bail!("OWNER, REPO, LOCAL_PATH, TARGET_BRANCH and FEATURE_BRANCH are required");
    };
    Ok(Target {
        owner,
        repo,
        local_path,
        target_branch,
        feature_branch,
    })
}

fn print_report(report: &DetectionReport, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(report).context("failed to serialize report")?;
        println!("{}", out);
    } else {
        for path in &report.independently_modified {
            println!("{}", path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// File values with CLI overrides applied. Env vars are not resolved yet.
fn layered_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => AppConfig::default(),
    };

    if let Some(api_url) = &cli.api_url {
        config.github.api_url = api_url.clone();
    }
    if let Some(token_env) = &cli.token_env {
        config.github.token_env = token_env.clone();
    }
    if let Some(per_page) = cli.per_page {
        config.github.per_page = per_page;
    }
    if let Some(remote) = &cli.remote {
        config.git.remote = remote.clone();
    }
    if let Some(git_binary) = &cli.git_binary {
        config.git.binary = git_binary.clone();
    }

    Ok(config)
}

fn resolve_config(mut config: AppConfig) -> Result<AppConfig> {
    config.resolve_env_vars();
    config.validate().context("invalid configuration")?;
    debug!(api_url = %config.github.api_url, "configuration ready");
    Ok(config)
}

fn read_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_from_file(path)
        .with_context(|| format!("failed to load configuration file {}", path.display()))
}
