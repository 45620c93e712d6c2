mod common;

use common::{
    fast_summarization, init_tracing, write_lists, FakeArticles, FakeVideos, ScriptedGenerator,
    StaticWatcher,
};
use link_pipeline::utils::content_key;
use link_pipeline::{
    ArtifactArea, FetchConfig, GenerationError, LlmConfig, Pipeline, PipelineConfig,
    PipelineError, SourceScope, SummaryStatus,
};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = "https://news.example.com/rss";

fn fake_pipeline(
    root: &TempDir,
    scope: SourceScope,
    generator: Arc<ScriptedGenerator>,
) -> Pipeline {
    let config = PipelineConfig::new(root.path()).with_scope(scope);
    Pipeline::builder(config)
        .watcher(Arc::new(
            StaticWatcher::new().feed(FEED, &["https://news.example.com/story"]),
        ))
        .article_extractor(Arc::new(FakeArticles::failing_on(&["https://dead.example.com/"])))
        .video_extractor(Arc::new(FakeVideos::default()))
        .generator(generator)
        .summarization_config(fast_summarization())
        .build()
        .unwrap()
}

fn seed(root: &TempDir) {
    write_lists(
        root.path(),
        &["https://one.example.com/", "https://dead.example.com/"],
        &[FEED, "https://youtu.be/clip"],
    );
}

#[tokio::test]
async fn test_full_run_then_idempotent_rerun() {
    init_tracing();
    let root = TempDir::new().unwrap();
    seed(&root);
    let generator = Arc::new(ScriptedGenerator::succeeding());
    let pipeline = fake_pipeline(&root, SourceScope::Both, generator.clone());

    let report = pipeline.run().await.unwrap();
    info!("First run: {}", serde_json::to_string(&report).unwrap());

    assert!(!report.cancelled);
    assert_eq!(report.scope, SourceScope::Both);
    assert_eq!(report.ingestion.unprocessed_links, 4);
    assert_eq!(report.extraction.successful, 3);
    assert_eq!(report.extraction.failed, 1);
    assert_eq!(report.summarization.successful_summaries, 3);
    assert_eq!(report.summarization.failed_summaries, 1);
    assert_eq!(generator.calls(), 3);

    let dead = pipeline
        .store()
        .read_summary(&content_key("https://dead.example.com/"))
        .unwrap();
    assert_eq!(dead.status, SummaryStatus::Failed);

    let second = pipeline.run().await.unwrap();
    assert_ne!(second.run_id, report.run_id);
    assert_eq!(second.ingestion.total_links, 4);
    assert_eq!(second.ingestion.unprocessed_links, 0);
    assert_eq!(second.summarization.total_processed, 0);
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_pending_writes_nothing() {
    init_tracing();
    let root = TempDir::new().unwrap();
    seed(&root);
    let generator = Arc::new(ScriptedGenerator::succeeding());
    let pipeline = fake_pipeline(&root, SourceScope::Manual, generator);

    let pending = pipeline.pending().await.unwrap();

    assert_eq!(pending.len(), 2);
    assert!(!root.path().join("artifacts").exists());
}

#[tokio::test]
async fn test_missing_credential_aborts_before_ingestion() {
    init_tracing();
    let root = TempDir::new().unwrap();
    seed(&root);
    let generator = Arc::new(ScriptedGenerator::unconfigured());
    let pipeline = fake_pipeline(&root, SourceScope::Both, generator);

    let result = pipeline.run().await;

    assert!(matches!(
        result,
        Err(PipelineError::Generation(GenerationError::Config(_)))
    ));
    assert!(!root.path().join("artifacts").exists());
}

#[tokio::test]
async fn test_cancelled_pipeline_schedules_no_items() {
    init_tracing();
    let root = TempDir::new().unwrap();
    seed(&root);
    let generator = Arc::new(ScriptedGenerator::succeeding());
    let pipeline = fake_pipeline(&root, SourceScope::Both, generator.clone());

    pipeline.cancellation_token().cancel();
    let report = pipeline.run().await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.ingestion.unprocessed_links, 4);
    assert_eq!(report.extraction.total_extracted, 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_init_creates_layout_and_lists() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::succeeding());
    let pipeline = fake_pipeline(&root, SourceScope::Both, generator);

    pipeline.init().unwrap();
    pipeline.init().unwrap();

    for area in [ArtifactArea::Html, ArtifactArea::Videos, ArtifactArea::Summaries] {
        assert!(pipeline.store().area_dir(area).is_dir());
    }
    assert!(root.path().join("manual_links.txt").is_file());
    assert!(root.path().join("monitoring_list.txt").is_file());
}

#[tokio::test]
async fn test_end_to_end_over_http() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><title>Hello</title></head>
               <body><article><h1 class="entry-title">Hello World</h1>
               <p>The first post.</p></article></body></html>"#,
            "text/html",
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "openai/gpt-4o",
            "choices": [{"message": {"role": "assistant", "content": "A greeting post."}}],
            "usage": {"prompt_tokens": 40, "completion_tokens": 4, "total_tokens": 44}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let article = format!("{}/posts/hello", server.uri());
    write_lists(root.path(), &[article.as_str()], &[]);

    let pipeline = Pipeline::builder(PipelineConfig::new(root.path()))
        .fetch_config(FetchConfig {
            min_host_interval_ms: 0,
            ..FetchConfig::default()
        })
        .llm_config(
            LlmConfig::default()
                .with_api_key("sk-test")
                .with_base_url(server.uri()),
        )
        .summarization_config(fast_summarization())
        .build()
        .unwrap();

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.summarization.successful_summaries, 1);
    assert_eq!(report.summarization.total_tokens, 44);

    let key = content_key(&article);
    let extraction = pipeline
        .store()
        .read_extraction(link_pipeline::ContentKind::Article, &key)
        .unwrap();
    assert_eq!(extraction.title, "Hello World");
    assert!(extraction.body_text.contains("The first post."));

    let summary = pipeline.store().read_summary(&key).unwrap();
    assert_eq!(summary.summary_text.as_deref(), Some("A greeting post."));
    assert_eq!(summary.usage_metadata["model"], "openai/gpt-4o");
}
