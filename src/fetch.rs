use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::FetchError;
use crate::limiter::RateLimiter;

/// A completed fetch. `final_url` is where the response actually landed
/// after redirects; detection re-derives base URLs from it.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    pub final_url: String,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Outbound HTTP capability. Probes and drivers go through this seam so
/// tests can script responses without a network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;

    /// Lightweight existence check; returns the status code only.
    async fn head(&self, url: &str) -> Result<u16, FetchError>;
}

/// Browser-like header set sent with every request. Career sites on this
/// platform reject obviously scripted clients, so the values mirror a
/// current desktop Chrome.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Accept",
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers.insert("Cache-Control", HeaderValue::from_static("max-age=0"));
    headers.insert(
        "Referer",
        HeaderValue::from_static("https://www.google.com/"),
    );
    headers
}

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Rate-limited HTTP client with retry-on-timeout.
pub struct FetchClient {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    max_retries: u32,
}

impl FetchClient {
    pub fn new(limiter: Arc<RateLimiter>, timeout_secs: u64, max_retries: u32) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            limiter,
            max_retries: max_retries.max(1),
        }
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        // One token per page, not per attempt: retries cover the same
        // logical request.
        self.limiter.acquire().await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let final_url = response.url().to_string();
                    let body = response.text().await.map_err(FetchError::Transport)?;
                    return Ok(FetchResponse {
                        status,
                        body,
                        final_url,
                    });
                }
                Err(e) if e.is_timeout() && attempt < self.max_retries => {
                    tracing::warn!("Timeout fetching {url} (attempt {attempt}/{})", self.max_retries);
                }
                Err(e) if e.is_timeout() => {
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    tracing::warn!("Error fetching {url}: {e}");
                    return Err(FetchError::Transport(e));
                }
            }
        }
    }

    async fn head(&self, url: &str) -> Result<u16, FetchError> {
        self.limiter.acquire().await;
        let response = self.client.head(url).send().await?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        (listener, url)
    }

    /// Serve `count` plain 200 responses, one connection each.
    async fn serve_ok(listener: TcpListener, count: usize) {
        for _ in 0..count {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn limiter_gates_each_request() {
        let (listener, url) = bind().await;
        tokio::spawn(serve_ok(listener, 3));

        // 2 req/s stores a burst of two tokens, so the third request has
        // to wait roughly half a second for a refill.
        let limiter = Arc::new(RateLimiter::new(2.0));
        let client = FetchClient::new(limiter, 5, 1);

        let start = Instant::now();
        assert!(client.get(&url).await.unwrap().is_ok());
        assert!(client.get(&url).await.unwrap().is_ok());
        assert!(client.get(&url).await.unwrap().is_ok());
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn timeout_retries_spend_a_single_token() {
        let (listener, url) = bind().await;
        // Accept connections but never answer, so every attempt times out.
        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                held.push(stream);
            }
        });

        // 0.5 req/s stores half a token, so the acquire in front of the
        // first attempt waits ~1s; the two 1s timeout attempts then run
        // back to back for ~3s total. Acquiring again before the retry
        // would add another ~1s wait, pushing the total past 4s.
        let limiter = Arc::new(RateLimiter::new(0.5));
        let client = FetchClient::new(limiter, 1, 2);

        let start = Instant::now();
        let err = client.get(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { attempts: 2, .. }));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2900), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(3700), "{elapsed:?}");
    }

    #[tokio::test]
    async fn transport_error_aborts_without_retry() {
        let (listener, url) = bind().await;
        // Closing the listener leaves the port refusing connections.
        drop(listener);

        let client = FetchClient::new(Arc::new(RateLimiter::new(100.0)), 5, 3);
        let start = Instant::now();
        let err = client.get(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
