//! Google Drive API client for the index: listings, search, path resolution
//! and raw content access.

use std::path::Path;

use futures::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::json;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::auth::TokenProvider;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, FileEntry, FileMetadata, Listing, RawMetadata};
use crate::path::VirtualPath;
use crate::query::{self, ListRequest, SearchMode};

/// Base URL for Google Drive API v3.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upper bound on parent hops when rebuilding a path from a file ID.
pub const MAX_PATH_DEPTH: usize = 64;

/// Listing and search knobs.
#[derive(Debug, Clone)]
pub struct ListingOptions {
    pub files_list_page_size: u32,
    pub search_result_list_page_size: u32,
    pub search_all_drives: bool,
    pub search_mode: SearchMode,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            files_list_page_size: 100,
            search_result_list_page_size: 100,
            search_all_drives: false,
            search_mode: SearchMode::Name,
        }
    }
}

/// Client for the Drive folder tree behind the index.
#[derive(Clone)]
pub struct DriveClient {
    auth: TokenProvider,
    http: Client,
    api_base: String,
    options: ListingOptions,
}

impl DriveClient {
    /// Create a new DriveClient.
    ///
    /// # Arguments
    /// * `auth` - Provider for bearer tokens
    /// * `options` - Page sizes and search behavior
    pub fn new(auth: TokenProvider, options: ListingOptions) -> Self {
        Self {
            auth,
            http: Client::new(),
            api_base: DRIVE_API_BASE.to_string(),
            options,
        }
    }

    /// Point the client at a different Drive API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn auth(&self) -> &TokenProvider {
        &self.auth
    }

    pub fn options(&self) -> &ListingOptions {
        &self.options
    }

    /// List one page of the visible children of a folder.
    pub async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<Listing> {
        let mut request = ListRequest::new(query::list_children_query(folder_id), query::LIST_FIELDS);
        request.order_by = Some(query::LIST_ORDER);
        request.page_size = Some(self.options.files_list_page_size);
        request.corpora = Some(query::corpora(self.options.search_all_drives));
        request.page_token = page_token.map(str::to_string);

        self.files_list(&request).await
    }

    /// Search the index by file name (or full text, depending on the mode).
    ///
    /// A query with nothing left after sanitizing returns an empty page
    /// without touching the network.
    pub async fn search(&self, text: &str, page_token: Option<&str>) -> Result<Listing> {
        let Some(q) = query::search_query(text, self.options.search_mode) else {
            debug!(query = text, "Search query empty after sanitizing");
            return Ok(Listing::empty());
        };

        let mut request = ListRequest::new(q, query::SEARCH_FIELDS);
        request.order_by = Some(query::LIST_ORDER);
        request.page_size = Some(self.options.search_result_list_page_size);
        request.corpora = Some(query::corpora(self.options.search_all_drives));
        request.include_items_from_all_drives = self.options.search_all_drives;
        request.page_token = page_token.map(str::to_string);

        self.files_list(&request).await
    }

    /// Find a child folder by exact name. When several siblings share the
    /// name, the first one Drive returns wins.
    pub async fn find_child_folder(&self, parent_id: &str, name: &str) -> Result<Option<FileEntry>> {
        let request = ListRequest::new(
            query::child_folder_query(parent_id, name),
            query::FOLDER_LOOKUP_FIELDS,
        );
        let listing = self.files_list(&request).await?;
        Ok(listing.files.into_iter().next())
    }

    /// Resolve a virtual path below `root_id` to a folder ID.
    ///
    /// Returns `None` if any segment is missing. Upstream failures are logged
    /// and also reported as `None`.
    pub async fn resolve_path(&self, root_id: &str, path: &str) -> Option<String> {
        let path = VirtualPath::parse(path);
        let mut current = root_id.to_string();

        for segment in path.segments() {
            match self.find_child_folder(&current, segment).await {
                Ok(Some(folder)) => current = folder.id,
                Ok(None) => {
                    debug!(segment = %segment, parent = %current, "Path segment not found");
                    return None;
                }
                Err(e) => {
                    warn!(segment = %segment, parent = %current, "Failed to resolve path segment: {}", e);
                    return None;
                }
            }
        }

        Some(current)
    }

    /// Rebuild the virtual path of a file or folder below `root_id`.
    ///
    /// Files that do not live under the root are reported as not found.
    pub async fn path_of(&self, root_id: &str, file_id: &str) -> Result<VirtualPath> {
        let mut segments = Vec::new();
        let mut current = file_id.to_string();

        while current != root_id {
            if segments.len() == MAX_PATH_DEPTH {
                return Err(DriveError::FileNotFound(file_id.to_string()));
            }
            let entry = self.get_entry(&current).await?;
            let Some(parent) = entry.parents.first().cloned() else {
                return Err(DriveError::FileNotFound(file_id.to_string()));
            };
            segments.push(entry.name);
            current = parent;
        }

        segments.reverse();
        Ok(VirtualPath::from_segments(segments))
    }

    /// Get the full entry for a file ID.
    pub async fn get_entry(&self, file_id: &str) -> Result<FileEntry> {
        let request = self
            .authorized_get(&format!("{}/files/{}", self.api_base, file_id))
            .await?
            .query(&[("fields", query::ENTRY_FIELDS), ("supportsAllDrives", "true")]);

        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Get name, MIME type and size of a file.
    ///
    /// A response without a name is treated as a missing file.
    pub async fn get_metadata(&self, file_id: &str) -> Result<FileMetadata> {
        let request = self
            .authorized_get(&format!("{}/files/{}", self.api_base, file_id))
            .await?
            .query(&[("fields", query::METADATA_FIELDS), ("supportsAllDrives", "true")]);

        let raw: RawMetadata = self.send(request).await?.json().await?;
        let name = raw
            .name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DriveError::FileNotFound(file_id.to_string()))?;

        Ok(FileMetadata {
            name,
            mime_type: raw.mime_type,
            size: raw.size,
        })
    }

    /// Open the binary content of a file, forwarding `range` verbatim.
    ///
    /// The returned response has a success status; its body has not been read.
    pub async fn open_content(&self, file_id: &str, range: Option<&str>) -> Result<Response> {
        let mut request = self
            .authorized_get(&format!("{}/files/{}", self.api_base, file_id))
            .await?
            .query(&[("alt", "media"), ("supportsAllDrives", "true")]);

        if let Some(range) = range {
            request = request.header(RANGE, range);
        }

        self.send(request).await
    }

    /// Grant "anyone with the link" reader access to a file.
    pub async fn share_publicly(&self, file_id: &str) -> Result<()> {
        let token = self.auth.get_access_token().await?;
        info!(file_id, "Granting anyone-with-link reader permission");

        let request = self
            .http
            .post(format!("{}/files/{}/permissions", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true")])
            .json(&json!({ "role": "reader", "type": "anyone" }));

        self.send(request).await?;
        Ok(())
    }

    /// Download a file to a local path.
    ///
    /// # Arguments
    /// * `file_id` - The ID of the file to download
    /// * `destination` - The local path (file or existing directory)
    pub async fn download_file<P: AsRef<Path>>(
        &self,
        file_id: &str,
        destination: P,
    ) -> Result<FileMetadata> {
        let destination = destination.as_ref();
        let metadata = self.get_metadata(file_id).await?;

        let final_path = if destination.is_dir() {
            destination.join(&metadata.name)
        } else {
            destination.to_path_buf()
        };

        let response = self.open_content(file_id, None).await?;

        let mut file = File::create(&final_path).await?;
        if let Err(e) = write_body(&mut file, response).await {
            drop(file);
            warn!(path = ?final_path, "Download failed, removing partial file: {}", e);
            if let Err(remove_err) = tokio::fs::remove_file(&final_path).await {
                warn!(path = ?final_path, "Failed to remove partial file: {}", remove_err);
            }
            return Err(e);
        }

        Ok(metadata)
    }

    async fn files_list(&self, request: &ListRequest) -> Result<Listing> {
        debug!(q = %request.q, page_token = ?request.page_token, "files.list");
        let builder = self
            .authorized_get(&format!("{}/files", self.api_base))
            .await?
            .query(&request.query_pairs());

        let listing: Listing = self.send(builder).await?.json().await?;
        Ok(listing)
    }

    async fn authorized_get(&self, url: &str) -> Result<RequestBuilder> {
        let token = self.auth.get_access_token().await?;
        Ok(self.http.get(url).bearer_auth(token))
    }

    /// Send a request and turn non-success statuses into `ApiError`.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
            return Err(DriveError::ApiError {
                status: api_error.error.code,
                message: api_error.error.message,
            });
        }
        Err(DriveError::ApiError {
            status: status.as_u16(),
            message: error_body,
        })
    }
}

async fn write_body(file: &mut File, response: Response) -> Result<()> {
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}
