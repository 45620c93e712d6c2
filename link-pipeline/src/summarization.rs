use crate::llm_adapter::TextGenerator;
use crate::state::ArtifactStore;
use crate::types::{
    Completion, ExtractionRecord, GenerationError, Message, Metadata, Result, RetryPolicy,
    StageOutput, SummarizationConfig, SummaryRecord, SummaryStats, SummaryStatus,
};
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const EXTRACTION_FAILED_MESSAGE: &str = "Content extraction failed";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that creates concise, informative summaries \
of articles and videos. Focus on key points, main ideas, and actionable insights.";

/// The fixed two-message prompt for one extraction record.
pub fn build_prompt(record: &ExtractionRecord) -> Vec<Message> {
    let user = format!(
        "Please summarize this {}:\n\n\
         Title: {}\n\n\
         Content:\n{}\n\n\
         Provide a clear, structured summary covering:\n\
         1. Main topic and key points\n\
         2. Important details and supporting information\n\
         3. Key takeaways or conclusions",
        record.content_kind.describe(),
        record.title,
        record.body_text
    );
    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}

enum Generated {
    Done { completion: Completion, latency_ms: u64 },
    GaveUp { error: GenerationError, attempts: u32 },
}

/// Summarization stage. Failed extractions are recorded without a generation
/// call; everything else is summarized with bounded retry.
pub struct Summarization {
    generator: Arc<dyn TextGenerator>,
    store: ArtifactStore,
    config: SummarizationConfig,
    concurrency: usize,
}

impl Summarization {
    pub fn new(generator: Arc<dyn TextGenerator>, store: ArtifactStore) -> Self {
        Self {
            generator,
            store,
            config: SummarizationConfig::default(),
            concurrency: 1,
        }
    }

    pub fn with_config(mut self, config: SummarizationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(
        &self,
        records: &[ExtractionRecord],
        cancel: &CancellationToken,
    ) -> Result<StageOutput<SummaryRecord, SummaryStats>> {
        self.generator.validate()?;
        info!(
            "Summarizing {} extraction records with {}",
            records.len(),
            self.generator.model()
        );

        let summaries: Vec<(SummaryRecord, Option<u64>)> = stream::iter(records)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|record| self.summarize(record))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        if summaries.len() < records.len() {
            warn!(
                "Summarization cancelled, {} records not scheduled",
                records.len() - summaries.len()
            );
        }

        let mut stats = SummaryStats::default();
        let mut total_latency_ms = 0u64;
        let mut items = Vec::with_capacity(summaries.len());
        for (summary, latency_ms) in summaries {
            stats.total_processed += 1;
            match summary.status {
                SummaryStatus::Success => {
                    stats.successful_summaries += 1;
                    stats.total_tokens += token_count(&summary);
                    total_latency_ms += latency_ms.unwrap_or(0);
                }
                SummaryStatus::Failed => stats.failed_summaries += 1,
            }
            items.push(summary);
        }
        if stats.successful_summaries > 0 {
            stats.avg_latency_ms = total_latency_ms / stats.successful_summaries as u64;
        }

        info!(
            "Summarization complete: {} successful, {} failed, {} tokens",
            stats.successful_summaries, stats.failed_summaries, stats.total_tokens
        );
        Ok(StageOutput { items, stats })
    }

    async fn summarize(&self, record: &ExtractionRecord) -> Result<(SummaryRecord, Option<u64>)> {
        if !record.success {
            warn!("Skipping summarization for failed extraction: {}", record.url);
            let summary = SummaryRecord {
                error: Some(
                    record
                        .error
                        .clone()
                        .filter(|e| !e.is_empty())
                        .unwrap_or_else(|| EXTRACTION_FAILED_MESSAGE.to_string()),
                ),
                ..base_record(record, SummaryStatus::Failed)
            };
            self.store.write_summary(&summary)?;
            return Ok((summary, None));
        }

        info!("Generating summary for: {}", record.title);
        let messages = build_prompt(record);

        let (summary, latency) = match self.generate(&messages).await? {
            Generated::Done { completion, latency_ms } => {
                info!(
                    "Summary generated: {} ({} tokens, {}ms)",
                    record.title, completion.usage.total_tokens, latency_ms
                );
                let summary = SummaryRecord {
                    summary_text: Some(completion.text.clone()),
                    usage_metadata: usage_metadata(&completion, latency_ms, record),
                    ..base_record(record, SummaryStatus::Success)
                };
                (summary, Some(latency_ms))
            }
            Generated::GaveUp { error, attempts } => {
                error!("Failed to generate summary for {}: {}", record.url, error);
                let summary = SummaryRecord {
                    error: Some(error.to_string()),
                    error_type: Some(error.kind_name().to_string()),
                    retry_count: Some(attempts),
                    ..base_record(record, SummaryStatus::Failed)
                };
                (summary, None)
            }
        };

        self.store.write_summary(&summary)?;
        Ok((summary, latency))
    }

    /// Call the generator until it succeeds or the retry policy is exhausted.
    /// Configuration errors are returned immediately and abort the stage.
    async fn generate(&self, messages: &[Message]) -> Result<Generated> {
        let policy = &self.config.retry;
        let mut backoff = retry_backoff(policy);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let started = Instant::now();
            match self
                .generator
                .complete(messages, self.config.temperature, self.config.max_tokens)
                .await
            {
                Ok(completion) => {
                    return Ok(Generated::Done {
                        completion,
                        latency_ms: started.elapsed().as_millis() as u64,
                    })
                }
                Err(e @ GenerationError::Config(_)) => return Err(e.into()),
                Err(e) => {
                    if attempts < policy.max_attempts {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("Attempt {} failed ({}), retrying in {:?}", attempts, e, delay);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    return Ok(Generated::GaveUp { error: e, attempts });
                }
            }
        }
    }
}

fn retry_backoff(policy: &RetryPolicy) -> ExponentialBackoff<backoff::SystemClock> {
    let mut backoff = ExponentialBackoff {
        current_interval: policy.initial_delay,
        initial_interval: policy.initial_delay,
        randomization_factor: 0.0,
        multiplier: policy.multiplier,
        max_interval: policy.initial_delay.saturating_mul(32).max(Duration::from_millis(1)),
        max_elapsed_time: None,
        ..Default::default()
    };
    backoff.reset();
    backoff
}

fn base_record(record: &ExtractionRecord, status: SummaryStatus) -> SummaryRecord {
    SummaryRecord {
        url: record.url.clone(),
        content_key: record.content_key.clone(),
        status,
        title: record.title.clone(),
        content_kind: record.content_kind,
        summary_text: None,
        error: None,
        error_type: None,
        retry_count: None,
        usage_metadata: Metadata::new(),
    }
}

fn usage_metadata(completion: &Completion, latency_ms: u64, record: &ExtractionRecord) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("model".into(), Value::String(completion.model.clone()));
    metadata.insert("prompt_tokens".into(), Value::from(completion.usage.prompt_tokens));
    metadata.insert("completion_tokens".into(), Value::from(completion.usage.completion_tokens));
    metadata.insert("tokens".into(), Value::from(completion.usage.total_tokens));
    metadata.insert("latency_ms".into(), Value::from(latency_ms));
    metadata.insert(
        "original_metadata".into(),
        Value::Object(record.metadata.clone()),
    );
    metadata
}

fn token_count(summary: &SummaryRecord) -> u64 {
    summary
        .usage_metadata
        .get("tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentKind;

    fn record(kind: ContentKind) -> ExtractionRecord {
        ExtractionRecord {
            url: "https://example.com/a".into(),
            content_key: "k".into(),
            content_kind: kind,
            title: "A Title".into(),
            body_text: "Body words".into(),
            metadata: Metadata::new(),
            success: true,
            error: None,
        }
    }

    #[test]
    fn prompt_names_the_content_kind() {
        let messages = build_prompt(&record(ContentKind::Video));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1]
            .content
            .starts_with("Please summarize this video transcript:"));
        assert!(messages[1].content.contains("Title: A Title"));
        assert!(messages[1].content.contains("Content:\nBody words"));

        let messages = build_prompt(&record(ContentKind::Article));
        assert!(messages[1].content.starts_with("Please summarize this article:"));
    }

    #[test]
    fn backoff_doubles_without_jitter() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
        };
        let mut backoff = retry_backoff(&policy);
        let delays: Vec<u128> = (0..2)
            .filter_map(|_| backoff.next_backoff())
            .map(|d| d.as_millis())
            .collect();
        assert_eq!(delays, vec![100, 200]);
    }
}
