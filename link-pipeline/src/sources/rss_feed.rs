use crate::traits::Watcher;
use crate::types::{FetchConfig, PipelineError, Result};
use crate::utils;
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tracing::{info, warn};

/// Watcher that expands RSS/Atom feed URLs into their entry links
pub struct RssWatcher {
    fetcher: Fetcher,
    parser: FeedParser,
}

impl RssWatcher {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            parser: FeedParser::new(),
        }
    }

    pub fn with_config(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self::new(Fetcher::new(fetch_config)?))
    }
}

#[async_trait]
impl Watcher for RssWatcher {
    fn watcher_name(&self) -> String {
        "RSS Watcher".to_string()
    }

    fn handles(&self, source_url: &str) -> bool {
        utils::url::is_feed_url(source_url)
    }

    async fn fetch_links(&self, source_url: &str) -> Result<Vec<String>> {
        info!("Pulling RSS feed: {}", source_url);

        let page = self.fetcher.fetch_text(source_url).await.map_err(|e| match e {
            PipelineError::Feed(_) => e,
            other => PipelineError::Feed(format!(
                "Error fetching RSS feed {}: {}",
                source_url, other
            )),
        })?;

        let parsed = self.parser.parse_links(&page.body).map_err(|e| match e {
            PipelineError::Feed(msg) => PipelineError::Feed(format!("{}: {}", msg, source_url)),
            other => other,
        })?;
        if parsed.malformed {
            warn!(
                "RSS feed {} is malformed, using {} recovered entries",
                source_url,
                parsed.links.len()
            );
        }

        info!(
            "RssWatcher discovered {} links from {}",
            parsed.links.len(),
            source_url
        );
        Ok(parsed.links)
    }
}
