#![allow(dead_code)]

use async_trait::async_trait;
use link_pipeline::{
    ArticleContent, ArticleExtractor, Completion, ExtractionError, ExtractionFailure,
    GenerationError, Message, Metadata, PipelineError, Result, RetryPolicy, SummarizationConfig,
    TextGenerator, TokenUsage, VideoContent, VideoExtractor, Watcher,
};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn write_lists(root: &Path, manual: &[&str], monitoring: &[&str]) {
    fs::write(root.join("manual_links.txt"), manual.join("\n")).unwrap();
    fs::write(root.join("monitoring_list.txt"), monitoring.join("\n")).unwrap();
}

/// Summarization settings with millisecond retry delays.
pub fn fast_summarization() -> SummarizationConfig {
    SummarizationConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            multiplier: 2.0,
        },
        ..SummarizationConfig::default()
    }
}

/// Watcher serving canned feed expansions. Feeds mapped to `None` fail.
pub struct StaticWatcher {
    feeds: HashMap<String, Option<Vec<String>>>,
    calls: AtomicUsize,
}

impl StaticWatcher {
    pub fn new() -> Self {
        Self {
            feeds: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn feed(mut self, url: &str, links: &[&str]) -> Self {
        self.feeds.insert(
            url.to_string(),
            Some(links.iter().map(|l| l.to_string()).collect()),
        );
        self
    }

    pub fn broken_feed(mut self, url: &str) -> Self {
        self.feeds.insert(url.to_string(), None);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Watcher for StaticWatcher {
    fn watcher_name(&self) -> String {
        "Static Watcher".to_string()
    }

    fn handles(&self, source_url: &str) -> bool {
        link_pipeline::utils::url::is_feed_url(source_url)
    }

    async fn fetch_links(&self, source_url: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.feeds.get(source_url) {
            Some(Some(links)) => Ok(links.clone()),
            _ => Err(PipelineError::Feed(format!(
                "Malformed feed with no entries: {}",
                source_url
            ))),
        }
    }
}

/// Article extractor that fails for a fixed set of URLs.
#[derive(Default)]
pub struct FakeArticles {
    failing: HashSet<String>,
    blank_errors: bool,
    calls: AtomicUsize,
}

impl FakeArticles {
    pub fn failing_on(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| u.to_string()).collect(),
            blank_errors: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails like `failing_on` but with an empty error message.
    pub fn failing_silently_on(urls: &[&str]) -> Self {
        Self {
            blank_errors: true,
            ..Self::failing_on(urls)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArticleExtractor for FakeArticles {
    async fn extract(&self, url: &str) -> std::result::Result<ArticleContent, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(url) && self.blank_errors {
            return Err(ExtractionError::new(ExtractionFailure::Network, ""));
        }
        if self.failing.contains(url) {
            return Err(ExtractionError::new(
                ExtractionFailure::HttpStatus(404),
                format!("HTTP error fetching {}: HTTP 404", url),
            ));
        }
        Ok(ArticleContent {
            title: format!("Article at {}", url),
            body_text: "Some article text.".to_string(),
            author: Some("Writer".to_string()),
            publish_date: None,
            metadata: Metadata::new(),
        })
    }
}

#[derive(Default)]
pub struct FakeVideos {
    private: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeVideos {
    pub fn private(urls: &[&str]) -> Self {
        Self {
            private: urls.iter().map(|u| u.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoExtractor for FakeVideos {
    async fn extract(&self, url: &str) -> std::result::Result<VideoContent, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.private.contains(url) {
            return Err(ExtractionError::new(
                ExtractionFailure::Unavailable,
                format!("Video is private or unavailable: {}", url),
            ));
        }
        Ok(VideoContent {
            title: format!("Video at {}", url),
            transcript: "Video description.".to_string(),
            description: "Video description.".to_string(),
            channel: "Channel".to_string(),
            duration: Some(120),
            metadata: Metadata::new(),
        })
    }
}

/// Generator that fails its first `fail_first` calls, then succeeds.
pub struct ScriptedGenerator {
    fail_first: usize,
    error: GenerationError,
    invalid: bool,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn succeeding() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(fail_first: usize) -> Self {
        Self {
            fail_first,
            error: GenerationError::Api {
                status: 503,
                message: "upstream overloaded".to_string(),
            },
            invalid: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    pub fn with_error(mut self, error: GenerationError) -> Self {
        self.error = error;
        self
    }

    /// Fails `validate`, like a client without credentials.
    pub fn unconfigured() -> Self {
        Self {
            invalid: true,
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model(&self) -> &str {
        "fake/model"
    }

    fn validate(&self) -> std::result::Result<(), GenerationError> {
        if self.invalid {
            return Err(GenerationError::Config("no credential".to_string()));
        }
        Ok(())
    }

    async fn complete(
        &self,
        messages: &[Message],
        _temperature: f32,
        _max_tokens: Option<u32>,
    ) -> std::result::Result<Completion, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(self.error.clone());
        }
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(Completion {
            text: format!("Summary ({} prompt chars)", prompt.len()),
            model: "fake/model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        })
    }
}
