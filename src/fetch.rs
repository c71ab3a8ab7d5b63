use crate::common::constants::{PRICING_SITE, TOURNAMENT_SITE};
use crate::common::error::{Result, ScraperError};
use crate::config::FetcherConfig;
use crate::metrics;
use async_trait::async_trait;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Form-encoded POST payload.
pub type FormData = Vec<(String, String)>;

/// Anything that can turn a URL into page markup.
///
/// With `form` present the request is a form-encoded POST, otherwise a GET.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str, form: Option<&FormData>) -> Result<String>;
}

/// Random politeness delay applied after every request.
#[derive(Debug, Clone, Copy)]
pub struct DelayRange {
    min_ms: u64,
    max_ms: u64,
}

impl DelayRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    pub fn sample(&self) -> Duration {
        if self.min_ms == self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Exponential backoff: `backoff * 2^attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    delay: DelayRange,
    retry: RetryPolicy,
}

fn site_label(url: &str) -> &'static str {
    if url.contains(PRICING_SITE) {
        PRICING_SITE
    } else {
        TOURNAMENT_SITE
    }
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            delay: DelayRange::new(config.min_delay_ms, config.max_delay_ms),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff: Duration::from_millis(config.retry_backoff_ms),
            },
        })
    }

    async fn request_once(&self, url: &str, form: Option<&FormData>) -> Result<String> {
        let started = Instant::now();
        let request = match form {
            Some(form) => self.client.post(url).form(form),
            None => self.client.get(url),
        };
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        metrics::fetch::page_fetched(site_label(url), started.elapsed().as_secs_f64());
        Ok(body)
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str, form: Option<&FormData>) -> Result<String> {
        let mut attempt = 0;
        loop {
            let result = self.request_once(url, form).await;
            let pause = self.delay.sample();
            debug!("Sleeping {:?} after request to {}", pause, url);
            tokio::time::sleep(pause).await;

            match result {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let backoff = self.retry.backoff_for(attempt);
                    attempt += 1;
                    warn!(
                        "Retrying {} in {:?} (attempt {}/{}): {}",
                        url, backoff, attempt, self.retry.max_retries, e
                    );
                    metrics::fetch::retried(site_label(url));
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    metrics::fetch::failed(site_label(url));
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn quiet_config(max_retries: u32) -> FetcherConfig {
        FetcherConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            max_retries,
            retry_backoff_ms: 1,
            user_agent: "test".to_string(),
        }
    }

    /// Serves the given status lines in order, one per connection, and counts requests.
    async fn serve(responses: Vec<&'static str>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            for status in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let body = "<html>ok</html>";
                let reply = format!(
                    "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{}/format?f=LE", addr), hits)
    }

    #[test]
    fn test_delay_range_stays_in_bounds() {
        let range = DelayRange::new(5, 9);
        for _ in 0..50 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(9));
        }
        assert_eq!(DelayRange::new(3, 3).sample(), Duration::from_millis(3));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let (url, hits) = serve(vec!["503 Service Unavailable", "200 OK"]).await;
        let fetcher = HttpFetcher::new(&quiet_config(2)).unwrap();

        let body = fetcher.fetch(&url, None).await.unwrap();

        assert_eq!(body, "<html>ok</html>");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (url, hits) = serve(vec!["404 Not Found", "200 OK"]).await;
        let fetcher = HttpFetcher::new(&quiet_config(2)).unwrap();

        let form = vec![("cp".to_string(), "1".to_string())];
        let err = fetcher.fetch(&url, Some(&form)).await.unwrap_err();

        assert!(matches!(err, ScraperError::Fetch { status: 404, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
