use crate::types::{FetchConfig, PipelineError, Result};
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// A successfully downloaded document.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Shared HTTP client used by feed watchers and article extractors.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    rate_limiter: Arc<Mutex<HashMap<String, Instant>>>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            rate_limiter: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET `url` and return its body as text. Non-2xx responses are errors.
    pub async fn fetch_text(&self, url: &str) -> Result<FetchedPage> {
        let parsed = Url::parse(url)?;
        self.apply_rate_limit(&parsed).await;

        debug!("Fetching {}", url);
        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let limit_bytes = (self.config.max_body_size_mb * 1024 * 1024) as u64;
        if response.content_length().is_some_and(|len| len > limit_bytes) {
            return Err(self.too_large(url));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        // Chunked responses carry no length, so the cap is enforced while reading.
        let bytes = read_capped(response.bytes_stream(), limit_bytes)
            .await?
            .ok_or_else(|| self.too_large(url))?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        debug!("Fetched {} ({} bytes)", final_url, body.len());
        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    async fn apply_rate_limit(&self, url: &Url) {
        if self.config.min_host_interval_ms == 0 {
            return;
        }
        let host = url.host_str().unwrap_or("").to_string();
        let min_interval = Duration::from_millis(self.config.min_host_interval_ms);

        let wait_time = {
            let mut rate_limiter = self.rate_limiter.lock().await;
            let now = Instant::now();
            let next_slot = rate_limiter
                .get(&host)
                .map(|last| (*last + min_interval).max(now))
                .unwrap_or(now);
            rate_limiter.insert(host.clone(), next_slot);
            next_slot - now
        };

        if !wait_time.is_zero() {
            debug!("Rate limiting {}: waiting {:?}", host, wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }

    fn too_large(&self, url: &str) -> PipelineError {
        PipelineError::TooLarge {
            url: url.to_string(),
            limit_mb: self.config.max_body_size_mb,
        }
    }
}

/// Collect a byte stream, giving up with `None` once it exceeds `limit` bytes.
async fn read_capped<S, B, E>(stream: S, limit: u64) -> std::result::Result<Option<Vec<u8>>, E>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        if bytes.len() as u64 + chunk.len() as u64 > limit {
            return Ok(None);
        }
        bytes.extend_from_slice(chunk);
    }
    Ok(Some(bytes))
}
