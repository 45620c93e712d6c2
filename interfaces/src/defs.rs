use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Free-form metadata attached to extraction and summary artifacts.
pub type Metadata = Map<String, Value>;

/// Which source list contributed a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Manual,
    Monitored,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Manual => write!(f, "manual"),
            Provenance::Monitored => write!(f, "monitored"),
        }
    }
}

/// Selects which source lists a run reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceScope {
    Manual,
    Monitored,
    #[default]
    Both,
}

impl SourceScope {
    pub fn includes(&self, provenance: Provenance) -> bool {
        matches!(
            (self, provenance),
            (SourceScope::Both, _)
                | (SourceScope::Manual, Provenance::Manual)
                | (SourceScope::Monitored, Provenance::Monitored)
        )
    }
}

impl fmt::Display for SourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceScope::Manual => write!(f, "manual"),
            SourceScope::Monitored => write!(f, "monitored"),
            SourceScope::Both => write!(f, "both"),
        }
    }
}

/// A single URL approved for processing in the current run.
/// Recomputed every run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub url: String,
    pub content_key: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Article,
    Video,
}

impl ContentKind {
    /// Phrase used when describing the content to a text generator.
    pub fn describe(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Video => "video transcript",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Article => write!(f, "article"),
            ContentKind::Video => write!(f, "video"),
        }
    }
}

/// Outcome of extracting one work item. Failures are recorded too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub url: String,
    pub content_key: String,
    pub content_kind: ContentKind,
    pub title: String,
    pub body_text: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Success,
    Failed,
}

/// Terminal artifact for a content key. Its presence marks the URL as processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub url: String,
    pub content_key: String,
    pub status: SummaryStatus,
    pub title: String,
    pub content_kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(default)]
    pub usage_metadata: Metadata,
}

/// Chat message sent to a text generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// A generated completion as returned by a text generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
}

// Object style note:
// Records here are plain data. They are written once per content key per run
// and read back only by operators or tests; stages hand them to each other as
// complete in-memory lists.
