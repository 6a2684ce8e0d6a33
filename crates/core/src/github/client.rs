//! GitHub REST API client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LINK, USER_AGENT};
use tracing::{debug, info, instrument, warn};

use super::request::HistoryRequest;
use crate::errors::GitHubError;

/// Undecoded response body plus its pagination hint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub body: String,
    /// Value of the `Link` response header, if any.
    pub link: Option<String>,
}

/// Read-only transport for the history API.
///
/// Implementations return `Ok` only for successful responses; a status of 400
/// or above must be reported as [`GitHubError::Api`].
#[allow(async_fn_in_trait)]
pub trait HistoryApi {
    async fn get(&self, request: &HistoryRequest) -> Result<RawResponse, GitHubError>;
}

/// [`HistoryApi`] over HTTPS using `reqwest`.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl GitHubClient {
    /// Build a client. Without a token, requests are sent unauthenticated.
    pub fn new(token: Option<String>, timeout: Duration) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("clobbercheck/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        info!(
            authenticated = token.is_some(),
            timeout_secs = timeout.as_secs(),
            "created GitHubClient"
        );
        Ok(Self { http, token })
    }
}

impl HistoryApi for GitHubClient {
    #[instrument(skip(self), fields(url = %request))]
    async fn get(&self, request: &HistoryRequest) -> Result<RawResponse, GitHubError> {
        let mut req = self.http.get(request.url().clone());
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();

        let links: Vec<&str> = resp
            .headers()
            .get_all(LINK)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let link = (!links.is_empty()).then(|| links.join(", "));

        if status.as_u16() >= 400 {
            log_rate_limit(status.as_u16(), resp.headers());
            let body = resp.text().await.unwrap_or_else(|e| {
                debug!(error = %e, "failed to read error response body");
                format!("<unreadable response body: {}>", e)
            });
            warn!(status = status.as_u16(), "GitHub API returned an error");
            return Err(GitHubError::Api {
                status: status.as_u16(),
                url: request.to_string(),
                body,
            });
        }

        let body = resp.text().await?;
        debug!(bytes = body.len(), has_link = link.is_some(), "received response");
        Ok(RawResponse { body, link })
    }
}

fn log_rate_limit(status: u16, headers: &HeaderMap) {
    if status != 403 && status != 429 {
        return;
    }
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string()
    };
    if header("x-ratelimit-remaining") == "0" {
        warn!(reset_at = %header("x-ratelimit-reset"), "GitHub rate limit exhausted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction() {
        let client = GitHubClient::new(Some("ghp_test".into()), Duration::from_secs(5)).unwrap();
        assert_eq!(client.token.as_deref(), Some("ghp_test"));

        let anon = GitHubClient::new(None, Duration::from_secs(5)).unwrap();
        assert!(anon.token.is_none());
    }
}
