//! Tests for the reqwest-backed history client.
//!
//! Each test binds a local `TcpListener` that answers a fixed sequence of raw
//! HTTP/1.1 responses and hands back the requests it received.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use clobbercheck_core::errors::GitHubError;
use clobbercheck_core::github::{
    CommitSummary, GitHubClient, HistoryApi, HistoryRequest, Page, RequestBuilder,
};

struct Reply {
    status: &'static str,
    headers: Vec<String>,
    body: String,
    /// Content-Length to advertise instead of the real body length.
    declared_len: Option<usize>,
}

impl Reply {
    fn ok(body: &str) -> Self {
        Self {
            status: "200 OK",
            headers: Vec::new(),
            body: body.to_string(),
            declared_len: None,
        }
    }

    fn header(mut self, header: String) -> Self {
        self.headers.push(header);
        self
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

/// Answer one connection per reply, in order. Yields the raw request heads.
fn serve(listener: TcpListener, replies: Vec<Reply>) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut requests = Vec::new();
        for reply in replies {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            requests.push(String::from_utf8_lossy(&buf).to_string());

            let mut head = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                reply.status,
                reply.declared_len.unwrap_or(reply.body.len())
            );
            for header in &reply.headers {
                head.push_str(header);
                head.push_str("\r\n");
            }
            head.push_str("\r\n");
            sock.write_all(head.as_bytes()).await.unwrap();
            sock.write_all(reply.body.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        }
        requests
    })
}

fn client(token: Option<&str>) -> GitHubClient {
    GitHubClient::new(token.map(str::to_string), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_get_sends_auth_and_returns_link() {
    let (listener, base) = bind().await;
    let next = format!("{}/repos/o/r/commits?page=2", base);
    let server = serve(
        listener,
        vec![Reply::ok("[]").header(format!(r#"Link: <{}>; rel="next""#, next))],
    );

    let request = RequestBuilder::new(&base).unwrap().list_commits("o", "r").build();
    let raw = client(Some("ghp_secret")).get(&request).await.unwrap();
    assert_eq!(raw.body, "[]");
    assert!(raw.link.unwrap().contains(&next));

    let requests = server.await.unwrap();
    let head = requests[0].to_ascii_lowercase();
    assert!(head.starts_with("get /repos/o/r/commits http/1.1"));
    assert!(head.contains("authorization: bearer ghp_secret"));
    assert!(head.contains("accept: application/vnd.github+json"));
    assert!(head.contains("user-agent: clobbercheck/"));
}

#[tokio::test]
async fn test_get_without_token_sends_no_auth() {
    let (listener, base) = bind().await;
    let server = serve(listener, vec![Reply::ok("{}")]);

    let request = HistoryRequest::new(format!("{}/repos/o/r/commits/abc", base).parse().unwrap());
    let raw = client(None).get(&request).await.unwrap();
    assert!(raw.link.is_none());

    let requests = server.await.unwrap();
    assert!(!requests[0].to_ascii_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let (listener, base) = bind().await;
    let server = serve(
        listener,
        vec![Reply {
            status: "404 Not Found",
            headers: Vec::new(),
            body: r#"{"message":"Not Found"}"#.into(),
            declared_len: None,
        }],
    );

    let request = RequestBuilder::new(&base)
        .unwrap()
        .get_commit("o", "r", "deadbeef")
        .build();
    let err = client(Some("t")).get(&request).await.unwrap_err();
    match err {
        GitHubError::Api { status, url, body } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/repos/o/r/commits/deadbeef"));
            assert!(body.contains("Not Found"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_error_status_with_truncated_body() {
    let (listener, base) = bind().await;
    let server = serve(
        listener,
        vec![Reply {
            status: "502 Bad Gateway",
            headers: Vec::new(),
            body: r#"{"mess"#.into(),
            declared_len: Some(200),
        }],
    );

    let request = RequestBuilder::new(&base).unwrap().list_commits("o", "r").build();
    let err = client(None).get(&request).await.unwrap_err();
    match err {
        GitHubError::Api { status, body, .. } => {
            assert_eq!(status, 502);
            assert!(body.starts_with("<unreadable response body"), "body: {body}");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_rate_limited_is_api_error() {
    let (listener, base) = bind().await;
    let server = serve(
        listener,
        vec![Reply {
            status: "403 Forbidden",
            headers: vec![
                "x-ratelimit-remaining: 0".into(),
                "x-ratelimit-reset: 1700000000".into(),
            ],
            body: r#"{"message":"API rate limit exceeded"}"#.into(),
            declared_len: None,
        }],
    );

    let request = RequestBuilder::new(&base).unwrap().list_commits("o", "r").build();
    let err = client(None).get(&request).await.unwrap_err();
    assert!(matches!(err, GitHubError::Api { status: 403, .. }));
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let (listener, base) = bind().await;
    drop(listener);

    let request = RequestBuilder::new(&base).unwrap().list_commits("o", "r").build();
    let err = client(None).get(&request).await.unwrap_err();
    assert!(matches!(err, GitHubError::Http(_)));
}

#[tokio::test]
async fn test_pages_followed_through_client() {
    let (listener, base) = bind().await;
    let page2 = format!("{}/repos/o/r/commits?sha=main&page=2", base);
    let server = serve(
        listener,
        vec![
            Reply::ok(r#"[{"sha": "c1"}, {"sha": "c2"}]"#)
                .header(format!(r#"Link: <{}>; rel="next", <{}>; rel="last""#, page2, page2)),
            Reply::ok(r#"[{"sha": "c3"}]"#),
        ],
    );

    let api = client(Some("t"));
    let request = RequestBuilder::new(&base)
        .unwrap()
        .list_commits("o", "r")
        .sha("main")
        .build();
    let first: Page<Vec<CommitSummary>> = Page::fetch(&api, &request).await.unwrap();
    assert!(first.has_next());
    let second = first.next_page(&api).await.unwrap().unwrap();
    assert!(!second.has_next());

    let shas: Vec<String> = first
        .data()
        .iter()
        .chain(second.data())
        .map(|c| c.sha.clone())
        .collect();
    assert_eq!(shas, vec!["c1", "c2", "c3"]);

    let requests = server.await.unwrap();
    assert!(requests[1].starts_with("GET /repos/o/r/commits?sha=main&page=2 "));
}
