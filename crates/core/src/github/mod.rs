//! GitHub REST history API: request building, transport, and pagination.

pub mod client;
pub mod models;
pub mod page;
pub mod request;

pub use client::{GitHubClient, HistoryApi, RawResponse};
pub use models::{CommitDetail, CommitSummary, FileChange, FileStatus};
pub use page::{parse_next_link, Page};
pub use request::{HistoryRequest, RequestBuilder};
