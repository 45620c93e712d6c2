use crate::types::Result;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Read a static link list: one URL per line, `#` comments and blank lines
/// skipped, file order preserved. A missing file is an empty list.
pub fn read_links_from_file(path: &Path) -> Result<Vec<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Link list {} not found, treating as empty", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(parse_link_list(&content))
}

pub fn parse_link_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
