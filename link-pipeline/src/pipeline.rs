use crate::extraction::ContentExtraction;
use crate::html_extractor::HtmlArticleExtractor;
use crate::ingestion::LinkIngestion;
use crate::llm_adapter::{LlmConfig, OpenRouterClient, TextGenerator};
use crate::sources::RssWatcher;
use crate::state::{ArtifactArea, ArtifactStore};
use crate::summarization::Summarization;
use crate::traits::{ArticleExtractor, DedupStore, VideoExtractor, Watcher};
use crate::types::{
    ExtractionStats, FetchConfig, IngestionStats, LinkSources, PipelineConfig, Result,
    SourceScope, SummarizationConfig, SummaryStats, WorkItem,
};
use crate::video_extractor::{VideoExtractorConfig, YtDlpVideoExtractor};
use crate::Fetcher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Run-level output of one full pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub scope: SourceScope,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The run was cancelled before every item was scheduled
    pub cancelled: bool,
    pub ingestion: IngestionStats,
    pub extraction: ExtractionStats,
    pub summarization: SummaryStats,
}

/// Link ingestion, content extraction and summarization wired over one
/// artifact root.
pub struct Pipeline {
    config: PipelineConfig,
    store: ArtifactStore,
    generator: Arc<dyn TextGenerator>,
    ingestion: LinkIngestion,
    extraction: ContentExtraction,
    summarization: Summarization,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Token that stops scheduling new items when cancelled. Items already
    /// in flight run to completion.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Create the artifact areas and empty source lists if they are missing.
    pub fn init(&self) -> Result<()> {
        self.store.ensure_layout()?;
        for path in [self.config.manual_list(), self.config.monitoring_list()] {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => info!("Created {}", path.display()),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Work items the next run would process. Writes nothing.
    pub async fn pending(&self) -> Result<Vec<WorkItem>> {
        let sources = LinkSources::from(&self.config);
        let output = self.ingestion.run(&sources, self.config.scope).await?;
        Ok(output.items)
    }

    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", run_id = %run_id, scope = %self.config.scope);
        self.run_stages(run_id).instrument(span).await
    }

    async fn run_stages(&self, run_id: Uuid) -> Result<RunReport> {
        let started_at = Utc::now();
        info!("Starting pipeline run at {}", self.config.root.display());

        self.generator.validate()?;
        self.store.ensure_area(ArtifactArea::Summaries)?;

        let sources = LinkSources::from(&self.config);
        let ingested = self.ingestion.run(&sources, self.config.scope).await?;
        let extracted = self.extraction.run(&ingested.items, &self.cancel).await?;
        let summarized = self.summarization.run(&extracted.items, &self.cancel).await?;

        let cancelled = extracted.items.len() < ingested.items.len()
            || summarized.items.len() < extracted.items.len();

        let report = RunReport {
            run_id,
            scope: self.config.scope,
            started_at,
            finished_at: Utc::now(),
            cancelled,
            ingestion: ingested.stats,
            extraction: extracted.stats,
            summarization: summarized.stats,
        };
        info!(
            "Pipeline run finished: {} links, {} extracted, {} summarized",
            report.ingestion.unprocessed_links,
            report.extraction.successful,
            report.summarization.successful_summaries
        );
        Ok(report)
    }
}

/// Builder for [`Pipeline`]. Every capability not supplied explicitly gets
/// its production implementation.
pub struct PipelineBuilder {
    config: PipelineConfig,
    fetch_config: FetchConfig,
    summarization_config: SummarizationConfig,
    video_config: VideoExtractorConfig,
    llm_config: Option<LlmConfig>,
    watchers: Vec<Arc<dyn Watcher>>,
    articles: Option<Arc<dyn ArticleExtractor>>,
    videos: Option<Arc<dyn VideoExtractor>>,
    generator: Option<Arc<dyn TextGenerator>>,
    dedup: Option<Arc<dyn DedupStore>>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            fetch_config: FetchConfig::default(),
            summarization_config: SummarizationConfig::default(),
            video_config: VideoExtractorConfig::default(),
            llm_config: None,
            watchers: Vec::new(),
            articles: None,
            videos: None,
            generator: None,
            dedup: None,
        }
    }

    pub fn fetch_config(mut self, fetch_config: FetchConfig) -> Self {
        self.fetch_config = fetch_config;
        self
    }

    pub fn summarization_config(mut self, config: SummarizationConfig) -> Self {
        self.summarization_config = config;
        self
    }

    pub fn video_config(mut self, config: VideoExtractorConfig) -> Self {
        self.video_config = config;
        self
    }

    pub fn llm_config(mut self, config: LlmConfig) -> Self {
        self.llm_config = Some(config);
        self
    }

    /// Add a watcher. With none added, an [`RssWatcher`] is used.
    pub fn watcher(mut self, watcher: Arc<dyn Watcher>) -> Self {
        self.watchers.push(watcher);
        self
    }

    pub fn article_extractor(mut self, extractor: Arc<dyn ArticleExtractor>) -> Self {
        self.articles = Some(extractor);
        self
    }

    pub fn video_extractor(mut self, extractor: Arc<dyn VideoExtractor>) -> Self {
        self.videos = Some(extractor);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Replace the summaries-area dedup check.
    pub fn dedup_store(mut self, dedup: Arc<dyn DedupStore>) -> Self {
        self.dedup = Some(dedup);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let store = ArtifactStore::new(&self.config.root);
        let fetcher = Fetcher::new(self.fetch_config)?;

        let generator: Arc<dyn TextGenerator> = match self.generator {
            Some(generator) => generator,
            None => {
                let llm_config = match self.llm_config {
                    Some(config) => config,
                    None => LlmConfig::from_env()?,
                };
                Arc::new(OpenRouterClient::new(llm_config)?)
            }
        };

        let dedup = self
            .dedup
            .unwrap_or_else(|| Arc::new(store.clone()) as Arc<dyn DedupStore>);
        let watchers = if self.watchers.is_empty() {
            vec![Arc::new(RssWatcher::new(fetcher.clone())) as Arc<dyn Watcher>]
        } else {
            self.watchers
        };
        let ingestion = watchers
            .into_iter()
            .fold(LinkIngestion::new(dedup), LinkIngestion::with_watcher);

        let articles = self.articles.unwrap_or_else(|| {
            Arc::new(HtmlArticleExtractor::new(fetcher.clone())) as Arc<dyn ArticleExtractor>
        });
        let videos = self.videos.unwrap_or_else(|| {
            Arc::new(YtDlpVideoExtractor::new(self.video_config)) as Arc<dyn VideoExtractor>
        });
        let extraction = ContentExtraction::new(articles, videos, store.clone())
            .with_concurrency(self.config.concurrency);

        let summarization = Summarization::new(generator.clone(), store.clone())
            .with_config(self.summarization_config)
            .with_concurrency(self.config.concurrency);

        Ok(Pipeline {
            config: self.config,
            store,
            generator,
            ingestion,
            extraction,
            summarization,
            cancel: CancellationToken::new(),
        })
    }
}
