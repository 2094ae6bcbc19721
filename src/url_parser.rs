//! Extraction of Drive IDs from request parameters.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{DriveError, Result};

/// Drive URL shapes that carry an ID, tried in order.
static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // https://drive.google.com/drive/u/0/folders/<ID>
        r"^https?://drive\.google\.com/drive/(?:u/\d+/)?folders/([a-zA-Z0-9_-]+)",
        // https://drive.google.com/file/d/<ID>/view, .../preview
        r"^https?://drive\.google\.com/file/d/([a-zA-Z0-9_-]+)",
        // https://drive.google.com/open?id=<ID>, uc?export=download&id=<ID>
        r"^https?://drive\.google\.com/(?:open|uc)\?(?:[^#]*&)?id=([a-zA-Z0-9_-]+)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid Drive URL regex"))
    .collect()
});

/// Valid Google Drive ID pattern (alphanumeric, underscore, hyphen).
static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

/// Extract a Drive file or folder ID from a raw ID or a Drive URL.
///
/// ```
/// use drive_index::url_parser::parse_file_id;
///
/// let id = parse_file_id("https://drive.google.com/uc?export=download&id=1abc123").unwrap();
/// assert_eq!(id, "1abc123");
///
/// assert!(parse_file_id("../etc/passwd").is_err());
/// ```
pub fn parse_file_id(url_or_id: &str) -> Result<String> {
    let trimmed = url_or_id.trim();

    if let Some(id) = URL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(trimmed)?.get(1))
    {
        return Ok(id.as_str().to_string());
    }

    if ID_REGEX.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(DriveError::InvalidUrlOrId(url_or_id.to_string()))
}
