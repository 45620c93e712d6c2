use crate::types::{ExtractionError, Metadata, Result};
use async_trait::async_trait;

/// Discovers content URLs from a monitored source (RSS feed, aggregator, etc.)
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Human-readable name used in logs
    fn watcher_name(&self) -> String;

    /// Whether this watcher knows how to expand the given monitoring-list entry
    fn handles(&self, source_url: &str) -> bool;

    /// Expand a source URL into the article URLs it currently lists
    async fn fetch_links(&self, source_url: &str) -> Result<Vec<String>>;
}

/// Article content as returned by an article extractor.
#[derive(Debug, Clone, Default)]
pub struct ArticleContent {
    pub title: String,
    pub body_text: String,
    pub author: Option<String>,
    pub publish_date: Option<String>,
    pub metadata: Metadata,
}

/// Video content as returned by a video extractor.
#[derive(Debug, Clone, Default)]
pub struct VideoContent {
    pub title: String,
    /// Transcript, or the description when no transcript is available
    pub transcript: String,
    pub description: String,
    pub channel: String,
    pub duration: Option<u64>,
    pub metadata: Metadata,
}

#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> std::result::Result<ArticleContent, ExtractionError>;
}

#[async_trait]
pub trait VideoExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> std::result::Result<VideoContent, ExtractionError>;
}

/// Key-presence check answering "was this content key already processed?"
///
/// Read errors are returned, never folded into `false`.
pub trait DedupStore: Send + Sync {
    fn exists(&self, content_key: &str) -> Result<bool>;
}
