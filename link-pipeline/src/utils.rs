use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest.
pub const CONTENT_KEY_LEN: usize = 16;

/// Deterministic fixed-length key for a URL, used as the artifact file stem.
pub fn content_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..CONTENT_KEY_LEN / 2])
}

/// URL classification
pub mod url {
    use interfaces::defs::ContentKind;
    use url::Url;

    const FEED_PATTERNS: &[&str] = &[".xml", ".rss", "/feed", "/rss", "feeds/", "atom.xml"];
    const VIDEO_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "youtu.be", "m.youtube.com"];

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_string()))
    }

    /// Heuristic: does this monitoring-list entry look like an RSS/Atom feed?
    pub fn is_feed_url(url_str: &str) -> bool {
        let lower = url_str.to_lowercase();
        FEED_PATTERNS.iter().any(|pattern| lower.contains(pattern))
    }

    pub fn is_video_url(url_str: &str) -> bool {
        extract_domain(url_str)
            .map(|host| VIDEO_HOSTS.iter().any(|v| host.eq_ignore_ascii_case(v)))
            .unwrap_or(false)
    }

    pub fn content_kind(url_str: &str) -> ContentKind {
        if is_video_url(url_str) {
            ContentKind::Video
        } else {
            ContentKind::Article
        }
    }
}

/// Text processing utilities
pub mod text {
    /// Trim every line, drop blank ones, and join paragraphs with a blank line.
    pub fn normalize_paragraphs<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
        lines
            .into_iter()
            .flat_map(|chunk| chunk.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Collapse runs of whitespace into single spaces.
    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
