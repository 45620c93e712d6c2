use crate::types::{PipelineError, Result};
use feed_rs::parser;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    /// Entry links in document order
    pub links: Vec<String>,
    /// The document did not parse cleanly and links were recovered leniently
    pub malformed: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse RSS/Atom content into entry links.
    ///
    /// A malformed document still yields whatever entries can be recovered
    /// from it; it is an error only when nothing can be recovered.
    pub fn parse_links(&self, content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        match parser::parse(content.as_bytes()) {
            Ok(feed) => {
                let title = feed.title.map(|t| t.content);
                let links: Vec<String> = feed.entries.into_iter().filter_map(entry_link).collect();
                debug!("Parsed feed with {} linked entries", links.len());
                Ok(ParsedFeed {
                    title,
                    links,
                    malformed: false,
                })
            }
            Err(e) => {
                let links = recover_links(content);
                if links.is_empty() {
                    return Err(PipelineError::Feed(format!(
                        "Malformed feed with no entries (error: {})",
                        e
                    )));
                }
                warn!(
                    "Feed is malformed ({}), recovered {} entries anyway",
                    e,
                    links.len()
                );
                Ok(ParsedFeed {
                    title: None,
                    links,
                    malformed: true,
                })
            }
        }
    }
}

/// Primary link of an entry: the `alternate` (or unqualified) link, falling
/// back to the first link's href. Entries without any link are dropped.
fn entry_link(entry: feed_rs::model::Entry) -> Option<String> {
    let primary = entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| entry.links.first())?;

    let href = primary.href.trim();
    if href.is_empty() {
        None
    } else {
        Some(href.to_string())
    }
}

fn item_open_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<(?:item|entry)\b[^>]*>").unwrap())
}

fn item_close_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</(?:item|entry)\s*>").unwrap())
}

fn link_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<link\b[^>]*>\s*(?:<!\[CDATA\[)?\s*([^<\s]+?)\s*(?:\]\]>)?\s*</link\s*>")
            .unwrap()
    })
}

fn link_href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?is)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).unwrap())
}

/// Lenient scan of `<item>`/`<entry>` blocks for documents the strict parser
/// rejects. A block ends at its closing tag or at the next opening tag, so an
/// unclosed entry does not swallow its sibling. Uses the element text of
/// `<link>`, then its `href` attribute.
pub fn recover_links(content: &str) -> Vec<String> {
    let openers: Vec<_> = item_open_regex().find_iter(content).collect();

    openers
        .iter()
        .enumerate()
        .filter_map(|(i, opener)| {
            let end = openers.get(i + 1).map_or(content.len(), |next| next.start());
            let mut block = &content[opener.end()..end];
            if let Some(close) = item_close_regex().find(block) {
                block = &block[..close.start()];
            }
            link_text_regex()
                .captures(block)
                .or_else(|| link_href_regex().captures(block))
                .and_then(|c| c.get(1))
                .map(|m| decode_entities(m.as_str().trim()))
        })
        .filter(|link| !link.is_empty())
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
