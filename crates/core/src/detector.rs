//! Upstream overlap detection.
//!
//! Given a feature branch and the target branch it will merge into, the
//! detector finds the files that were modified on the feature branch since
//! the merge-base *and* modified again by commits that landed upstream after
//! that point. Those files are at risk of a conflicting or clobbering merge.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::{AppConfig, MAX_PER_PAGE};
use crate::errors::{DetectError, GitError, GitHubError};
use crate::git::runner::parse_name_only;
use crate::git::{GitRunner, VcsRunner};
use crate::github::{
    CommitDetail, CommitSummary, FileChange, FileStatus, GitHubClient, HistoryApi, Page,
    RequestBuilder,
};

/// Summary of one detection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Merge-base of the feature branch and the remote target branch.
    pub base_sha: String,
    /// Author timestamp of the merge-base commit.
    pub base_date: DateTime<Utc>,
    /// Paths modified on the feature branch since the merge-base.
    pub local_modified: BTreeSet<String>,
    /// Number of upstream commits whose file lists were inspected.
    pub upstream_commits_scanned: usize,
    /// Paths also modified upstream; always a subset of `local_modified`.
    pub independently_modified: BTreeSet<String>,
}

/// Detects files modified both locally and upstream since divergence.
///
/// Both collaborators are injected so runs can be driven against fakes.
/// Calls are issued one at a time, in order; nothing is cached between runs.
pub struct FileChangesDetector<A, G> {
    api: A,
    git: G,
    requests: RequestBuilder,
    remote: String,
    per_page: u32,
}

impl FileChangesDetector<GitHubClient, GitRunner> {
    /// Build a detector wired to the real `git` binary and GitHub API.
    pub fn from_config(config: &AppConfig) -> Result<Self, GitHubError> {
        let api = GitHubClient::new(config.github.token.clone(), config.github.timeout())?;
        let requests = RequestBuilder::new(&config.github.api_url)?;
        Ok(Self::new(api, GitRunner::new(&config.git.binary), requests)
            .with_remote(&config.git.remote)
            .with_per_page(config.github.per_page))
    }
}

impl<A: HistoryApi, G: VcsRunner> FileChangesDetector<A, G> {
    pub fn new(api: A, git: G, requests: RequestBuilder) -> Self {
        Self {
            api,
            git,
            requests,
            remote: "origin".into(),
            per_page: MAX_PER_PAGE,
        }
    }

    /// Remote that carries the target branch (default `origin`).
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Page size for the upstream commit listing, clamped to 1..=100.
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    /// Return the set of files modified on `feature_branch` that were also
    /// modified on `target_branch` since the two diverged.
    pub async fn detect(
        &self,
        owner: &str,
        repo: &str,
        local_repo_path: &Path,
        target_branch: &str,
        feature_branch: &str,
    ) -> Result<BTreeSet<String>, DetectError> {
        let report = self
            .detect_report(owner, repo, local_repo_path, target_branch, feature_branch)
            .await?;
        Ok(report.independently_modified)
    }

    /// Like [`detect`](Self::detect) but returns the full [`DetectionReport`].
    #[instrument(skip(self, local_repo_path), fields(path = %local_repo_path.display()))]
    pub async fn detect_report(
        &self,
        owner: &str,
        repo: &str,
        local_repo_path: &Path,
        target_branch: &str,
        feature_branch: &str,
    ) -> Result<DetectionReport, DetectError> {
        let base_sha = self
            .merge_base(local_repo_path, target_branch, feature_branch)
            .await?;
        let local_modified = self
            .local_modified_files(local_repo_path, &base_sha, feature_branch)
            .await?;
        info!(
            base = %base_sha,
            local_modified = local_modified.len(),
            "resolved divergence point"
        );

        let base_date = self.commit_date(owner, repo, &base_sha).await?;

        // Every commit on the target branch dated at or after the base.
        let listing = self
            .requests
            .list_commits(owner, repo)
            .sha(target_branch)
            .since(base_date)
            .per_page(self.per_page)
            .build();

        let mut independently_modified = BTreeSet::new();
        let mut upstream_commits_scanned = 0;
        let mut page: Page<Vec<CommitSummary>> = Page::fetch(&self.api, &listing).await?;
        loop {
            for commit in page.data() {
                upstream_commits_scanned += 1;
                for file in self.commit_files(owner, repo, &commit.sha).await? {
                    if file.status == FileStatus::Modified
                        && local_modified.contains(&file.filename)
                    {
                        debug!(sha = %commit.sha, path = %file.filename, "modified upstream");
                        independently_modified.insert(file.filename);
                    }
                }
            }
            match page.next_page(&self.api).await? {
                Some(next) => page = next,
                None => break,
            }
        }

        info!(
            commits = upstream_commits_scanned,
            overlapping = independently_modified.len(),
            "detection complete"
        );
        Ok(DetectionReport {
            base_sha,
            base_date,
            local_modified,
            upstream_commits_scanned,
            independently_modified,
        })
    }

    async fn merge_base(
        &self,
        dir: &Path,
        target_branch: &str,
        feature_branch: &str,
    ) -> Result<String, GitError> {
        let upstream = format!("{}/{}", self.remote, target_branch);
        let output = self
            .git
            .run(dir, &["merge-base", feature_branch, &upstream])
            .await?;
        let sha = output.stdout.trim();
        if sha.is_empty() {
            return Err(GitError::NoMergeBase {
                feature: feature_branch.to_string(),
                target: upstream,
            });
        }
        Ok(sha.to_string())
    }

    async fn local_modified_files(
        &self,
        dir: &Path,
        base_sha: &str,
        feature_branch: &str,
    ) -> Result<BTreeSet<String>, GitError> {
        let output = self
            .git
            .run(
                dir,
                &["diff", "--name-only", "--diff-filter=M", base_sha, feature_branch],
            )
            .await?;
        Ok(parse_name_only(&output.stdout).map(str::to_string).collect())
    }

    async fn commit_date(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<DateTime<Utc>, GitHubError> {
        let request = self.requests.get_commit(owner, repo, sha).build();
        let page: Page<CommitDetail> = Page::fetch(&self.api, &request).await?;
        page.data()
            .author_date()
            .ok_or_else(|| GitHubError::MissingAuthorDate {
                sha: sha.to_string(),
            })
    }

    /// All file records of one commit, merged across its file-list pages.
    async fn commit_files(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<FileChange>, GitHubError> {
        let request = self.requests.get_commit(owner, repo, sha).build();
        let mut page: Page<CommitDetail> = Page::fetch(&self.api, &request).await?;
        let mut files = Vec::new();
        loop {
            let next = page.next_page(&self.api).await?;
            files.extend(page.into_data().files);
            match next {
                Some(next) => page = next,
                None => break,
            }
        }
        debug!(sha, files = files.len(), "fetched commit files");
        Ok(files)
    }
}
