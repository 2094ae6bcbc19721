//! Drive query-language builders for listings, search and folder lookup.

use clap::ValueEnum;

use crate::models::FOLDER_MIME_TYPE;

/// Google-native types that cannot be downloaded as binary content.
const HIDDEN_MIME_TYPES: [&str; 5] = [
    "application/vnd.google-apps.shortcut",
    "application/vnd.google-apps.document",
    "application/vnd.google-apps.spreadsheet",
    "application/vnd.google-apps.form",
    "application/vnd.google-apps.site",
];

/// Sentinel configuration file that is never listed.
pub const PASSWORD_FILE: &str = ".password";

/// Folders first, then by name, ties broken by newest modification.
pub const LIST_ORDER: &str = "folder,name,modifiedTime desc";

pub const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size, modifiedTime, fileExtension, iconLink, thumbnailLink, parents, driveId)";
pub const SEARCH_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size, modifiedTime)";
pub const FOLDER_LOOKUP_FIELDS: &str = "files(id, name, mimeType)";
pub const METADATA_FIELDS: &str = "name,mimeType,size";
pub const ENTRY_FIELDS: &str = "id, name, mimeType, size, modifiedTime, parents, driveId";

/// Which Drive field multi-word search terms are matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SearchMode {
    /// `name contains` for every word.
    #[default]
    Name,
    /// `fullText contains` for every word (content and metadata).
    FullText,
}

impl SearchMode {
    fn field(self) -> &'static str {
        match self {
            SearchMode::Name => "name",
            SearchMode::FullText => "fullText",
        }
    }
}

/// Strip characters that would break the query grammar from a search string.
///
/// `! " ' = < > / \ :` are removed, list separators become spaces and the
/// result is trimmed. Applying it twice yields the same string.
pub fn format_search_keyword(keyword: &str) -> String {
    keyword
        .chars()
        .filter(|c| !matches!(c, '!' | '"' | '\'' | '=' | '<' | '>' | '/' | '\\' | ':'))
        .map(|c| match c {
            ',' | '，' | '|' | '(' | ')' | '{' | '}' => ' ',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn exclusions() -> String {
    let mut clauses = vec![format!("name != '{}'", PASSWORD_FILE)];
    clauses.extend(
        HIDDEN_MIME_TYPES
            .iter()
            .map(|mime| format!("mimeType != '{}'", mime)),
    );
    clauses.join(" and ")
}

/// Query for the visible children of a folder.
pub fn list_children_query(folder_id: &str) -> String {
    format!(
        "'{}' in parents and trashed = false and {}",
        escape_literal(folder_id),
        exclusions()
    )
}

/// Query for a non-trashed child folder with an exact name.
pub fn child_folder_query(parent_id: &str, name: &str) -> String {
    format!(
        "'{}' in parents and name = '{}' and mimeType = '{}' and trashed = false",
        escape_literal(parent_id),
        escape_literal(name),
        FOLDER_MIME_TYPE
    )
}

/// Query for a search; `None` when nothing searchable is left after
/// sanitizing.
pub fn search_query(text: &str, mode: SearchMode) -> Option<String> {
    let formatted = format_search_keyword(text);
    if formatted.is_empty() {
        return None;
    }

    let terms = formatted
        .split_whitespace()
        .map(|word| format!("{} contains '{}'", mode.field(), word))
        .collect::<Vec<_>>()
        .join(" and ");

    Some(format!(
        "trashed = false and {} and ({})",
        exclusions(),
        terms
    ))
}

/// Parameters of one `files.list` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub q: String,
    pub fields: &'static str,
    pub order_by: Option<&'static str>,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
    pub corpora: Option<&'static str>,
    pub include_items_from_all_drives: bool,
}

impl ListRequest {
    pub fn new(q: String, fields: &'static str) -> Self {
        Self {
            q,
            fields,
            order_by: None,
            page_size: None,
            page_token: None,
            corpora: None,
            include_items_from_all_drives: true,
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.q.clone()),
            ("fields", self.fields.to_string()),
            ("supportsAllDrives", "true".to_string()),
            (
                "includeItemsFromAllDrives",
                self.include_items_from_all_drives.to_string(),
            ),
        ];
        if let Some(order_by) = self.order_by {
            pairs.push(("orderBy", order_by.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("pageSize", page_size.to_string()));
        }
        if let Some(corpora) = self.corpora {
            pairs.push(("corpora", corpora.to_string()));
        }
        if let Some(token) = &self.page_token {
            pairs.push(("pageToken", token.clone()));
        }
        pairs
    }
}

/// `corpora` value for the configured search scope.
pub fn corpora(search_all_drives: bool) -> &'static str {
    if search_all_drives {
        "allDrives"
    } else {
        "user"
    }
}
