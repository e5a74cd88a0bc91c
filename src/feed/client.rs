//! Feed client trait and the HTTP implementation

use super::types::FeedRecord;
use crate::config::SyncConfig;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a fetch produced no records
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("response did not match the feed shape: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Per-fetch parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// Only records newer than this ISO-8601 timestamp
    pub since: Option<String>,
}

/// Source of decoded feed records
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch one page of records
    async fn fetch(&self, options: &FetchOptions) -> FeedResult<Vec<FeedRecord>>;

    /// Fetch, treating any failure as an empty feed
    async fn fetch_or_empty(&self, options: &FetchOptions) -> Vec<FeedRecord> {
        match self.fetch(options).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "feed fetch failed; nothing to ingest");
                Vec::new()
            }
        }
    }
}

/// Reads the feed over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: reqwest::Client,
    url: String,
    per_page: u32,
}

impl HttpFeedClient {
    pub fn new(config: &SyncConfig) -> FeedResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: config.feed_url.clone(),
            per_page: config.per_page,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn query(&self, options: &FetchOptions) -> Vec<(&'static str, String)> {
        let mut query = vec![("per_page", self.per_page.to_string())];
        if let Some(since) = options.since.as_deref().filter(|s| !s.is_empty()) {
            query.push(("since", since.to_string()));
        }
        query
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch(&self, options: &FetchOptions) -> FeedResult<Vec<FeedRecord>> {
        let response = self
            .client
            .get(&self.url)
            .query(&self.query(options))
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        let records: Vec<FeedRecord> = serde_json::from_slice(&body)?;
        debug!(count = records.len(), url = %self.url, "fetched feed records");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP response on a loopback port.
    ///
    /// Returns the base URL and a receiver for the raw request head.
    async fn serve_once(status: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&head).to_string());
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        (format!("http://{}/commits", addr), rx)
    }

    fn client_for(url: &str) -> HttpFeedClient {
        HttpFeedClient::new(&SyncConfig {
            feed_url: url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    const ONE_RECORD: &str = r#"[{"sha":"abc","url":"https://x/abc","commit":{"author":{"name":"Ann","email":"ann@example.com","date":"2023-08-15T10:30:00Z"},"message":"Fix crash"}}]"#;

    #[tokio::test]
    async fn fetch_decodes_records_and_sends_page_size() {
        let (url, request) = serve_once("200 OK", ONE_RECORD).await;
        let client = client_for(&url);

        let records = client.fetch(&FetchOptions::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sha, "abc");

        let head = request.await.unwrap();
        assert!(head.starts_with("GET /commits?per_page=100 "));
        assert!(head.to_lowercase().contains("user-agent: commitsync/"));
    }

    #[tokio::test]
    async fn since_is_sent_only_when_present() {
        let (url, request) = serve_once("200 OK", "[]").await;
        let client = client_for(&url);

        let options = FetchOptions {
            since: Some("2023-08-15T10:30:00Z".to_string()),
        };
        assert!(client.fetch(&options).await.unwrap().is_empty());
        let head = request.await.unwrap();
        assert!(head.contains("since=2023-08-15T10%3A30%3A00Z"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, _request) = serve_once("403 Forbidden", r#"{"message":"rate limited"}"#).await;
        let client = client_for(&url);

        let result = client.fetch(&FetchOptions::default()).await;
        assert!(matches!(result, Err(FeedError::HttpStatus(403))));
    }

    #[tokio::test]
    async fn wrong_shape_is_a_decode_error() {
        let (url, _request) = serve_once("200 OK", r#"{"not":"an array"}"#).await;
        let client = client_for(&url);

        let result = client.fetch(&FetchOptions::default()).await;
        assert!(matches!(result, Err(FeedError::Decode(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error_and_reads_as_empty() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client_for(&format!("http://{}/commits", addr));

        let result = client.fetch(&FetchOptions::default()).await;
        assert!(matches!(result, Err(FeedError::Transport(_))));
        assert!(client.fetch_or_empty(&FetchOptions::default()).await.is_empty());
    }
}
