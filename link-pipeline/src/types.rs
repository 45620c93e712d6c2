use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use interfaces::defs::{
    Completion, ContentKind, ExtractionRecord, Message, Metadata, Provenance, SourceScope,
    SummaryRecord, SummaryStatus, TokenUsage, WorkItem,
};

pub const MANUAL_LIST_FILE: &str = "manual_links.txt";
pub const MONITORING_LIST_FILE: &str = "monitoring_list.txt";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_redirects: usize,
    pub max_body_size_mb: usize,
    /// Minimum spacing between two requests to the same host.
    pub min_host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "link-pipeline/0.1".to_string(),
            timeout_seconds: 30,
            max_redirects: 5,
            max_body_size_mb: 10,
            min_host_interval_ms: 1000,
        }
    }
}

/// Bounded exponential retry for text generation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummarizationConfig {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub retry: RetryPolicy,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: Some(1000),
            retry: RetryPolicy::default(),
        }
    }
}

/// Per-invocation settings of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub root: PathBuf,
    pub scope: SourceScope,
    /// Items processed at once inside the extraction and summarization stages.
    pub concurrency: usize,
}

impl PipelineConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scope: SourceScope::Both,
            concurrency: 1,
        }
    }

    pub fn with_scope(mut self, scope: SourceScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn manual_list(&self) -> PathBuf {
        self.root.join(MANUAL_LIST_FILE)
    }

    pub fn monitoring_list(&self) -> PathBuf {
        self.root.join(MONITORING_LIST_FILE)
    }
}

/// Paths of the two static source lists.
#[derive(Debug, Clone)]
pub struct LinkSources {
    pub manual: PathBuf,
    pub monitoring: PathBuf,
}

impl From<&PipelineConfig> for LinkSources {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            manual: config.manual_list(),
            monitoring: config.monitoring_list(),
        }
    }
}

/// Output of a stage: the full item list plus run-level counters.
#[derive(Debug, Clone)]
pub struct StageOutput<T, S> {
    pub items: Vec<T>,
    pub stats: S,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStats {
    pub manual_links: usize,
    pub monitoring_links: usize,
    pub total_links: usize,
    pub feeds_expanded: usize,
    pub feeds_failed: usize,
    pub unprocessed_links: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_extracted: usize,
    pub successful: usize,
    pub failed: usize,
    pub article_count: usize,
    pub video_count: usize,
    pub article_failed: usize,
    pub video_failed: usize,
}

impl ExtractionStats {
    pub fn record(&mut self, record: &ExtractionRecord) {
        self.total_extracted += 1;
        match record.content_kind {
            ContentKind::Article => self.article_count += 1,
            ContentKind::Video => self.video_count += 1,
        }
        if record.success {
            self.successful += 1;
        } else {
            self.failed += 1;
            match record.content_kind {
                ContentKind::Article => self.article_failed += 1,
                ContentKind::Video => self.video_failed += 1,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_processed: usize,
    pub successful_summaries: usize,
    pub failed_summaries: usize,
    pub total_tokens: u64,
    pub avg_latency_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFailure {
    Network,
    HttpStatus(u16),
    Timeout,
    Parse,
    /// Private, removed or region-locked video.
    Unavailable,
    Tool,
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionFailure::Network => write!(f, "network error"),
            ExtractionFailure::HttpStatus(code) => write!(f, "http status {code}"),
            ExtractionFailure::Timeout => write!(f, "timeout"),
            ExtractionFailure::Parse => write!(f, "parse error"),
            ExtractionFailure::Unavailable => write!(f, "unavailable"),
            ExtractionFailure::Tool => write!(f, "extractor tool error"),
        }
    }
}

/// The single error type every extractor reports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExtractionError {
    pub kind: ExtractionFailure,
    pub message: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl GenerationError {
    pub fn kind_name(&self) -> &'static str {
        match self {
            GenerationError::Config(_) => "ConfigError",
            GenerationError::Network(_) => "NetworkError",
            GenerationError::Api { .. } => "ApiError",
            GenerationError::Parse(_) => "ParseError",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Response from {url} exceeds {limit_mb}MB")]
    TooLarge { url: String, limit_mb: usize },

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
