pub mod types;
pub mod traits;
pub mod utils;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod state;
pub mod html_extractor;
pub mod video_extractor;
pub mod llm_adapter;
pub mod ingestion;
pub mod extraction;
pub mod summarization;
pub mod pipeline;

pub use types::*;
pub use traits::{
    ArticleContent, ArticleExtractor, DedupStore, VideoContent, VideoExtractor, Watcher,
};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::RssWatcher;
pub use state::{ArtifactArea, ArtifactStore};
pub use html_extractor::HtmlArticleExtractor;
pub use video_extractor::YtDlpVideoExtractor;
pub use llm_adapter::{LlmConfig, OpenRouterClient, TextGenerator};
pub use ingestion::LinkIngestion;
pub use extraction::ContentExtraction;
pub use summarization::Summarization;
pub use pipeline::{Pipeline, PipelineBuilder, RunReport};
