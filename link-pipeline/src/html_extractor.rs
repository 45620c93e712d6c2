use crate::traits::{ArticleContent, ArticleExtractor};
use crate::types::{ExtractionError, ExtractionFailure, Metadata, PipelineError};
use crate::utils::text;
use crate::Fetcher;
use async_trait::async_trait;
use chrono::Utc;
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

const STRIPPED_TAGS: &[&str] = &["script", "style", "iframe", "nav", "footer", "aside"];
const STRIPPED_CLASS_MARKERS: &[&str] = &["advertisement", "ad-container", "social-share", "comments"];

/// Article extractor for ordinary web pages.
pub struct HtmlArticleExtractor {
    fetcher: Fetcher,
}

impl HtmlArticleExtractor {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ArticleExtractor for HtmlArticleExtractor {
    async fn extract(&self, url: &str) -> Result<ArticleContent, ExtractionError> {
        let page = self
            .fetcher
            .fetch_text(url)
            .await
            .map_err(|e| fetch_error(url, e))?;

        let mut content = parse_article(&page.body);
        content
            .metadata
            .insert("final_url".to_string(), Value::String(page.final_url));
        debug!("Extracted article '{}' from {}", content.title, url);
        Ok(content)
    }
}

fn fetch_error(url: &str, error: PipelineError) -> ExtractionError {
    let kind = match &error {
        PipelineError::HttpStatus { status, .. } => ExtractionFailure::HttpStatus(*status),
        PipelineError::Http(e) if e.is_timeout() => ExtractionFailure::Timeout,
        PipelineError::Http(_) | PipelineError::TooLarge { .. } => ExtractionFailure::Network,
        _ => ExtractionFailure::Parse,
    };
    let message = match kind {
        ExtractionFailure::Parse => format!("Error extracting content from {}: {}", url, error),
        _ => format!("HTTP error fetching {}: {}", url, error),
    };
    ExtractionError::new(kind, message)
}

/// Extract title, body text, author and publish date from an HTML document.
///
/// Scripts, navigation, ads and comment sections are ignored everywhere.
pub fn parse_article(html: &str) -> ArticleContent {
    let doc = Html::parse_document(html);

    let title = extract_title(&doc);
    let body_text = extract_body(&doc);
    let author = extract_author(&doc);
    let publish_date = extract_publish_date(&doc);

    let mut metadata = Metadata::new();
    metadata.insert("content_length".to_string(), Value::from(body_text.chars().count()));
    metadata.insert("extracted_at".to_string(), Value::String(Utc::now().to_rfc3339()));

    ArticleContent {
        title,
        body_text,
        author,
        publish_date,
        metadata,
    }
}

fn is_stripped(element: &Element) -> bool {
    if STRIPPED_TAGS.contains(&element.name()) {
        return true;
    }
    element
        .attr("class")
        .map(|class| {
            let class = class.to_lowercase();
            STRIPPED_CLASS_MARKERS.iter().any(|m| class.contains(m))
        })
        .unwrap_or(false)
}

fn is_visible(element: ElementRef<'_>) -> bool {
    !is_stripped(element.value())
        && !element
            .ancestors()
            .filter_map(|node| node.value().as_element())
            .any(is_stripped)
}

fn class_contains(element: &Element, needle: &str) -> bool {
    element
        .attr("class")
        .map(|class| class.to_lowercase().contains(needle))
        .unwrap_or(false)
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !is_stripped(child_element.value()) {
                collect_text(child_element, out);
            }
        }
    }
}

fn text_lines(element: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    collect_text(element, &mut lines);
    lines
}

fn inline_text(element: ElementRef<'_>) -> String {
    text::collapse_whitespace(&text_lines(element).join(" "))
}

fn select_first<'a, F>(doc: &'a Html, css: &str, predicate: F) -> Option<ElementRef<'a>>
where
    F: Fn(ElementRef<'a>) -> bool,
{
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector)
        .filter(|el| is_visible(*el))
        .find(|el| predicate(*el))
}

fn meta_content(doc: &Html, css: &str) -> Option<String> {
    select_first(doc, css, |_| true)
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn element_text(element: Option<ElementRef<'_>>) -> Option<String> {
    element.map(inline_text).filter(|t| !t.is_empty())
}

fn extract_title(doc: &Html) -> String {
    element_text(select_first(doc, "h1", |el| class_contains(el.value(), "title")))
        .or_else(|| meta_content(doc, r#"meta[property="og:title"]"#))
        .or_else(|| meta_content(doc, r#"meta[name="twitter:title"]"#))
        .or_else(|| {
            let selector = Selector::parse("title").ok()?;
            doc.select(&selector)
                .next()
                .map(|t| text::collapse_whitespace(&t.text().collect::<String>()))
                .filter(|t| !t.is_empty())
        })
        .or_else(|| element_text(select_first(doc, "h1", |_| true)))
        .unwrap_or_else(|| "Untitled".to_string())
}

fn extract_body(doc: &Html) -> String {
    let containers = [
        select_first(doc, "article", |_| true),
        select_first(doc, "div", |el| class_contains(el.value(), "content")),
        select_first(doc, "div", |el| class_contains(el.value(), "article")),
        select_first(doc, "main", |_| true),
    ];
    for container in containers.into_iter().flatten() {
        let body = text::normalize_paragraphs(text_lines(container).iter().map(String::as_str));
        if !body.is_empty() {
            return body;
        }
    }

    if let Ok(p) = Selector::parse("p") {
        let paragraphs: Vec<String> = doc
            .select(&p)
            .filter(|el| is_visible(*el))
            .map(inline_text)
            .filter(|t| !t.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join("\n\n");
        }
    }

    select_first(doc, "body", |_| true)
        .map(|body| text::normalize_paragraphs(text_lines(body).iter().map(String::as_str)))
        .unwrap_or_default()
}

fn extract_author(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[name="author"]"#)
        .or_else(|| meta_content(doc, r#"meta[property="article:author"]"#))
        .or_else(|| element_text(select_first(doc, r#"a[rel="author"]"#, |_| true)))
        .or_else(|| element_text(select_first(doc, "span", |el| class_contains(el.value(), "author"))))
}

fn extract_publish_date(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[property="article:published_time"]"#)
        .or_else(|| meta_content(doc, r#"meta[name="publish_date"]"#))
        .or_else(|| meta_content(doc, r#"meta[name="date"]"#))
        .or_else(|| {
            select_first(doc, "time[datetime]", |_| true)
                .and_then(|el| el.value().attr("datetime"))
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE: &str = r#"<!doctype html>
<html>
  <head>
    <title>Document Title</title>
    <meta property="og:title" content="Social Title">
    <meta name="author" content="Jane Doe">
    <meta property="article:published_time" content="2024-03-01T10:00:00Z">
    <script>var tracking = "ignore me";</script>
  </head>
  <body>
    <nav><h1 class="site-title">Site Name</h1></nav>
    <article>
      <h1 class="post-title">Real Headline</h1>
      <p>First paragraph.</p>
      <div class="advertisement">Buy things!</div>
      <p>Second   paragraph.</p>
      <div class="comments">Nice post</div>
    </article>
    <footer>Copyright</footer>
  </body>
</html>"#;

    #[test]
    fn extracts_title_body_and_meta() {
        let content = parse_article(ARTICLE);

        assert_eq!(content.title, "Real Headline");
        assert!(content.body_text.contains("First paragraph."));
        assert!(content.body_text.contains("Second   paragraph."));
        assert!(!content.body_text.contains("Buy things"));
        assert!(!content.body_text.contains("Nice post"));
        assert!(!content.body_text.contains("Site Name"));
        assert_eq!(content.author.as_deref(), Some("Jane Doe"));
        assert_eq!(content.publish_date.as_deref(), Some("2024-03-01T10:00:00Z"));
        assert!(content.metadata.contains_key("extracted_at"));
    }

    #[test]
    fn title_falls_back_through_meta_then_document_title() {
        let with_og = r#"<html><head><title>Doc</title><meta property="og:title" content="OG"></head><body><p>x</p></body></html>"#;
        assert_eq!(parse_article(with_og).title, "OG");

        let doc_only = r#"<html><head><title> Doc </title></head><body><h1>Heading</h1></body></html>"#;
        assert_eq!(parse_article(doc_only).title, "Doc");

        let heading_only = r#"<html><body><h1>Heading</h1></body></html>"#;
        assert_eq!(parse_article(heading_only).title, "Heading");

        assert_eq!(parse_article("<html><body></body></html>").title, "Untitled");
    }

    #[test]
    fn body_falls_back_to_paragraphs_then_body_text() {
        let paragraphs = r#"<html><body><section><p>One</p><p>Two</p></section><aside><p>Side</p></aside></body></html>"#;
        assert_eq!(parse_article(paragraphs).body_text, "One\n\nTwo");

        let bare = r#"<html><body><span>Loose</span> text<script>x()</script></body></html>"#;
        assert_eq!(parse_article(bare).body_text, "Loose\n\ntext");
    }

    #[test]
    fn author_and_date_from_inline_markup() {
        let html = r#"<html><body><span class="byline-author">By Sam</span><time datetime="2024-05-05">May 5</time><p>x</p></body></html>"#;
        let content = parse_article(html);
        assert_eq!(content.author.as_deref(), Some("By Sam"));
        assert_eq!(content.publish_date.as_deref(), Some("2024-05-05"));
    }

    fn extractor() -> HtmlArticleExtractor {
        let config = FetchConfig {
            min_host_interval_ms: 0,
            ..Default::default()
        };
        HtmlArticleExtractor::new(Fetcher::new(config).unwrap())
    }

    #[tokio::test]
    async fn http_status_becomes_extraction_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/nope", server.uri());
        let err = extractor().extract(&url).await.unwrap_err();

        assert_eq!(err.kind, ExtractionFailure::HttpStatus(404));
        assert!(err.message.starts_with("HTTP error fetching"));
        assert!(err.message.contains(&url));
    }

    #[tokio::test]
    async fn invalid_url_becomes_parse_error() {
        let err = extractor().extract("not a url").await.unwrap_err();

        assert_eq!(err.kind, ExtractionFailure::Parse);
        assert!(err.message.contains("not a url"));
    }
}
