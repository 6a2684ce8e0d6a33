//! One page of a paginated collection plus its continuation locator.

use serde::de::DeserializeOwned;
use tracing::debug;

use super::client::HistoryApi;
use super::request::HistoryRequest;
use crate::errors::GitHubError;

/// A decoded page. Immutable: [`Page::next_page`] returns a new page and
/// leaves this one as it was.
#[derive(Debug, Clone)]
pub struct Page<T> {
    data: T,
    next: Option<HistoryRequest>,
}

impl<T: DeserializeOwned> Page<T> {
    /// Issue `request` and decode the body as `T`.
    pub async fn fetch<A: HistoryApi>(api: &A, request: &HistoryRequest) -> Result<Self, GitHubError> {
        let raw = api.get(request).await?;
        let data = serde_json::from_str(&raw.body).map_err(|source| GitHubError::Decode {
            url: request.to_string(),
            source,
        })?;

        let next = match raw.link.as_deref().and_then(parse_next_link) {
            Some(target) => {
                // Relative locators resolve against the page that carried them.
                let url = request
                    .url()
                    .join(target)
                    .map_err(|e| GitHubError::InvalidUrl {
                        url: target.to_string(),
                        detail: e.to_string(),
                    })?;
                Some(HistoryRequest::new(url))
            }
            None => None,
        };
        debug!(url = %request, has_next = next.is_some(), "fetched page");
        Ok(Self { data, next })
    }

    /// Fetch the following page. Returns `Ok(None)` on a terminal page
    /// without touching the transport.
    pub async fn next_page<A: HistoryApi>(&self, api: &A) -> Result<Option<Self>, GitHubError> {
        match &self.next {
            Some(request) => Self::fetch(api, request).await.map(Some),
            None => Ok(None),
        }
    }
}

impl<T> Page<T> {
    pub fn new(data: T, next: Option<HistoryRequest>) -> Self {
        Self { data, next }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn next_request(&self) -> Option<&HistoryRequest> {
        self.next.as_ref()
    }
}

/// Extract the `rel="next"` target from a `Link` header value.
///
/// The header holds entries of the form `<url>; rel="a b"; other=x`,
/// separated by commas. Entries without a well-formed `<url>` are skipped.
pub fn parse_next_link(header: &str) -> Option<&str> {
    let mut rest = header;
    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let close = after.find('>')?;
        let target = &after[..close];
        // An unterminated entry runs into the next one; resume at its `<`.
        if let Some(inner) = target.find('<') {
            rest = &after[inner..];
            continue;
        }
        let tail = &after[close + 1..];
        let params_end = tail.find('<').unwrap_or(tail.len());
        if rel_has_next(&tail[..params_end]) {
            return Some(target);
        }
        rest = &tail[params_end..];
    }
    None
}

fn rel_has_next(params: &str) -> bool {
    params
        .split([';', ','])
        .filter_map(|param| param.split_once('='))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case("rel"))
        .any(|(_, value)| {
            value
                .trim()
                .trim_matches('"')
                .split_whitespace()
                .any(|token| token == "next")
        })
}
