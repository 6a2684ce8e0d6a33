//! Request descriptors for the GitHub commit history endpoints.
//!
//! [`RequestBuilder`] knows the API base URL and hands out one chainable
//! endpoint builder per request shape. Path segments are percent-encoded one
//! at a time and query pairs are form-encoded in insertion order.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;

use crate::errors::GitHubError;

/// Immutable, fully-encoded GET target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    url: Url,
}

impl HistoryRequest {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for HistoryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Entry point for building requests against one API host.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base: Url,
}

impl RequestBuilder {
    /// Parse the API base URL, e.g. `https://api.github.com` or
    /// `https://ghe.example.com/api/v3`.
    pub fn new(api_url: &str) -> Result<Self, GitHubError> {
        let invalid = |detail: &str| GitHubError::InvalidUrl {
            url: api_url.to_string(),
            detail: detail.to_string(),
        };
        let mut base = Url::parse(api_url.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base.path_segments_mut().is_err() {
            return Err(invalid("URL cannot be used as a base"));
        }
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self { base })
    }

    pub fn api_url(&self) -> &Url {
        &self.base
    }

    /// `GET /repos/{owner}/{repo}/commits`
    pub fn list_commits(&self, owner: &str, repo: &str) -> ListCommitsEndpoint {
        ListCommitsEndpoint {
            query: Query::new(self.endpoint(&["repos", owner, repo, "commits"])),
        }
    }

    /// `GET /repos/{owner}/{repo}/commits/{ref}`
    pub fn get_commit(&self, owner: &str, repo: &str, git_ref: &str) -> GetCommitEndpoint {
        GetCommitEndpoint {
            query: Query::new(self.endpoint(&["repos", owner, repo, "commits", git_ref])),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Base-ability was checked in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Ordered query parameters; re-setting a key keeps its first position.
#[derive(Debug, Clone)]
struct Query {
    url: Url,
    params: Vec<(&'static str, String)>,
}

impl Query {
    fn new(url: Url) -> Self {
        Self {
            url,
            params: Vec::new(),
        }
    }

    fn set(&mut self, key: &'static str, value: String) {
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    fn build(self) -> HistoryRequest {
        let mut url = self.url;
        if !self.params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        HistoryRequest::new(url)
    }
}

fn iso8601(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Builder for the list-commits endpoint.
#[derive(Debug, Clone)]
pub struct ListCommitsEndpoint {
    query: Query,
}

impl ListCommitsEndpoint {
    /// SHA or branch to start listing commits from.
    pub fn sha(mut self, sha: &str) -> Self {
        self.query.set("sha", sha.to_string());
        self
    }

    /// Only commits touching this file path.
    pub fn path(mut self, path: &str) -> Self {
        self.query.set("path", path.to_string());
        self
    }

    /// GitHub login or email address.
    pub fn author(mut self, author: &str) -> Self {
        self.query.set("author", author.to_string());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.query.set("since", iso8601(since));
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.query.set("until", iso8601(until));
        self
    }

    pub fn per_page(mut self, count: u32) -> Self {
        self.query.set("per_page", count.to_string());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.query.set("page", page.to_string());
        self
    }

    pub fn build(self) -> HistoryRequest {
        self.query.build()
    }
}

/// Builder for the get-commit endpoint. Paging parameters apply to the
/// commit's file list.
#[derive(Debug, Clone)]
pub struct GetCommitEndpoint {
    query: Query,
}

impl GetCommitEndpoint {
    pub fn per_page(mut self, count: u32) -> Self {
        self.query.set("per_page", count.to_string());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.query.set("page", page.to_string());
        self
    }

    pub fn build(self) -> HistoryRequest {
        self.query.build()
    }
}
