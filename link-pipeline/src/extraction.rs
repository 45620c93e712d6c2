use crate::state::ArtifactStore;
use crate::traits::{ArticleContent, ArticleExtractor, VideoContent, VideoExtractor};
use crate::types::{
    ContentKind, ExtractionError, ExtractionRecord, ExtractionStats, Metadata, Result,
    StageOutput, WorkItem,
};
use crate::utils;
use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const FAILED_TITLE: &str = "Extraction Failed";

/// Content extraction stage: routes each work item to the article or video
/// extractor and persists one artifact per item, successful or not.
pub struct ContentExtraction {
    articles: Arc<dyn ArticleExtractor>,
    videos: Arc<dyn VideoExtractor>,
    store: ArtifactStore,
    concurrency: usize,
}

impl ContentExtraction {
    pub fn new(
        articles: Arc<dyn ArticleExtractor>,
        videos: Arc<dyn VideoExtractor>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            articles,
            videos,
            store,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Extract every item in order. Extractor failures become failed records;
    /// only artifact storage errors abort the stage.
    pub async fn run(
        &self,
        items: &[WorkItem],
        cancel: &CancellationToken,
    ) -> Result<StageOutput<ExtractionRecord, ExtractionStats>> {
        info!("Extracting content for {} work items", items.len());

        let records: Vec<ExtractionRecord> = stream::iter(items)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|item| self.extract_item(item))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        if records.len() < items.len() {
            warn!(
                "Extraction cancelled, {} items not scheduled",
                items.len() - records.len()
            );
        }

        let mut stats = ExtractionStats::default();
        for record in &records {
            stats.record(record);
        }

        info!(
            "Extraction complete: {} successful, {} failed ({} articles, {} videos)",
            stats.successful, stats.failed, stats.article_count, stats.video_count
        );
        Ok(StageOutput {
            items: records,
            stats,
        })
    }

    async fn extract_item(&self, item: &WorkItem) -> Result<ExtractionRecord> {
        let kind = utils::url::content_kind(&item.url);
        info!("Extracting content from: {}", item.url);

        let outcome = match kind {
            ContentKind::Video => self.videos.extract(&item.url).await.map(video_parts),
            ContentKind::Article => self.articles.extract(&item.url).await.map(article_parts),
        };

        let record = match outcome {
            Ok((title, body_text, metadata)) => {
                info!("Successfully extracted: {}", title);
                ExtractionRecord {
                    url: item.url.clone(),
                    content_key: item.content_key.clone(),
                    content_kind: kind,
                    title,
                    body_text,
                    metadata,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Extraction failed for {} ({}): {}", item.url, e.kind, e);
                failed_record(item, kind, &e)
            }
        };

        self.store.write_extraction(&record)?;
        Ok(record)
    }
}

fn failed_record(item: &WorkItem, kind: ContentKind, error: &ExtractionError) -> ExtractionRecord {
    ExtractionRecord {
        url: item.url.clone(),
        content_key: item.content_key.clone(),
        content_kind: kind,
        title: FAILED_TITLE.to_string(),
        body_text: String::new(),
        metadata: Metadata::new(),
        success: false,
        error: Some(failure_message(item, error)),
    }
}

fn failure_message(item: &WorkItem, error: &ExtractionError) -> String {
    if error.message.trim().is_empty() {
        format!("{} extracting {}", error.kind, item.url)
    } else {
        error.message.clone()
    }
}

fn optional_string(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

fn article_parts(content: ArticleContent) -> (String, String, Metadata) {
    let mut metadata = Metadata::new();
    metadata.insert("author".into(), optional_string(content.author));
    metadata.insert("publish_date".into(), optional_string(content.publish_date));
    metadata.extend(content.metadata);
    (content.title, content.body_text, metadata)
}

fn video_parts(content: VideoContent) -> (String, String, Metadata) {
    let mut metadata = Metadata::new();
    metadata.insert("channel".into(), Value::String(content.channel));
    metadata.insert(
        "duration".into(),
        content.duration.map(Value::from).unwrap_or(Value::Null),
    );
    metadata.insert("description".into(), Value::String(content.description));
    metadata.extend(content.metadata);
    (content.title, content.transcript, metadata)
}
