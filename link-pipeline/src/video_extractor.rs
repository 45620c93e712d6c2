use crate::traits::{VideoContent, VideoExtractor};
use crate::types::{ExtractionError, ExtractionFailure, Metadata};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

pub const NO_TEXT_PLACEHOLDER: &str = "No transcript or description available";

const CAPTION_LANGS: &[&str] = &["en", "en-US", "en-GB"];
const CAPTION_FORMATS: &[&str] = &["vtt", "srv3", "srv2", "srv1"];

#[derive(Debug, Clone)]
pub struct VideoExtractorConfig {
    /// Path or name of the `yt-dlp` executable
    pub binary: String,
    pub timeout: Duration,
}

impl Default for VideoExtractorConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Video metadata extractor backed by the `yt-dlp` command line tool.
///
/// Captions are never downloaded; the description stands in for the transcript.
pub struct YtDlpVideoExtractor {
    config: VideoExtractorConfig,
}

impl YtDlpVideoExtractor {
    pub fn new(config: VideoExtractorConfig) -> Self {
        Self { config }
    }
}

impl Default for YtDlpVideoExtractor {
    fn default() -> Self {
        Self::new(VideoExtractorConfig::default())
    }
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    ext: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VideoInfo {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    upload_date: Option<String>,
    view_count: Option<u64>,
    like_count: Option<u64>,
    #[serde(default)]
    subtitles: HashMap<String, Vec<CaptionTrack>>,
    #[serde(default)]
    automatic_captions: HashMap<String, Vec<CaptionTrack>>,
}

impl VideoInfo {
    fn has_captions(&self) -> bool {
        [&self.automatic_captions, &self.subtitles].iter().any(|tracks| {
            CAPTION_LANGS.iter().any(|lang| {
                tracks.get(*lang).is_some_and(|list| {
                    list.iter()
                        .any(|t| t.ext.as_deref().is_some_and(|e| CAPTION_FORMATS.contains(&e)))
                })
            })
        })
    }
}

#[async_trait]
impl VideoExtractor for YtDlpVideoExtractor {
    async fn extract(&self, url: &str) -> Result<VideoContent, ExtractionError> {
        debug!("Running {} for {}", self.config.binary, url);

        let run = Command::new(&self.config.binary)
            .args(["--dump-json", "--skip-download", "--no-warnings", "--no-playlist", url])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.config.timeout, run)
            .await
            .map_err(|_| {
                ExtractionError::new(
                    ExtractionFailure::Timeout,
                    format!("yt-dlp timed out after {:?} for {}", self.config.timeout, url),
                )
            })?
            .map_err(|e| {
                ExtractionError::new(
                    ExtractionFailure::Tool,
                    format!("Failed to run {}: {}", self.config.binary, e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(url, stderr.trim()));
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout).map_err(|e| {
            ExtractionError::new(
                ExtractionFailure::Parse,
                format!("Failed to extract info from {}: {}", url, e),
            )
        })?;

        Ok(video_content(info))
    }
}

/// Private or removed videos are told apart from other tool failures.
pub(crate) fn classify_failure(url: &str, stderr: &str) -> ExtractionError {
    let lower = stderr.to_lowercase();
    if lower.contains("private") || lower.contains("unavailable") {
        ExtractionError::new(
            ExtractionFailure::Unavailable,
            format!("Video is private or unavailable: {}", url),
        )
    } else {
        ExtractionError::new(
            ExtractionFailure::Tool,
            format!("yt-dlp error for {}: {}", url, stderr),
        )
    }
}

pub(crate) fn video_content(info: VideoInfo) -> VideoContent {
    let has_captions = info.has_captions();
    let description = info.description.clone().unwrap_or_default();
    let transcript = if description.trim().is_empty() {
        NO_TEXT_PLACEHOLDER.to_string()
    } else {
        description.clone()
    };

    let mut metadata = Metadata::new();
    metadata.insert("video_id".into(), Value::String(info.id.unwrap_or_default()));
    metadata.insert("upload_date".into(), Value::String(info.upload_date.unwrap_or_default()));
    metadata.insert("view_count".into(), Value::from(info.view_count.unwrap_or(0)));
    metadata.insert("like_count".into(), Value::from(info.like_count.unwrap_or(0)));
    metadata.insert("extracted_at".into(), Value::String(Utc::now().to_rfc3339()));
    metadata.insert("has_transcript".into(), Value::Bool(false));
    metadata.insert("has_captions".into(), Value::Bool(has_captions));

    VideoContent {
        title: info.title.unwrap_or_else(|| "Untitled".to_string()),
        transcript,
        description,
        channel: info
            .channel
            .or(info.uploader)
            .unwrap_or_else(|| "Unknown".to_string()),
        duration: info.duration.map(|d| d.round() as u64),
        metadata,
    }
}
