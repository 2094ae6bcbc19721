//! Content proxy: streams Drive file content to callers or hands out public
//! links instead.

use std::fmt;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE,
};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::client::DriveClient;
use crate::error::{DriveError, Result};
use crate::models::{DirectLinks, FileMetadata};
use crate::path::encode_component;
use crate::range::{ByteRange, RangeError};

/// Whether the browser should display the file or save it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// How a file is delivered to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Proxy the bytes through this service.
    Stream { disposition: Disposition },
    /// Make the file public and return Drive's own links.
    DirectLink,
}

/// What to do with an incoming `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePolicy {
    /// Pass it upstream untouched and relay whatever Drive answers.
    Forward,
    /// Resolve it against the known size and answer 206 ourselves.
    Resolve,
}

/// Status, headers and an unbuffered body ready to be sent to a client.
pub struct StreamedContent {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, Result<Bytes>>,
}

impl fmt::Debug for StreamedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamedContent")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Either proxied bytes or public links, depending on the delivery mode.
#[derive(Debug)]
pub enum ContentResponse {
    Stream(StreamedContent),
    DirectLink(DirectLinks),
}

/// Public download URL for a file shared with "anyone with the link".
pub fn public_download_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={}", file_id)
}

/// Embedded preview URL for a file shared with "anyone with the link".
pub fn public_preview_url(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/preview", file_id)
}

/// Upstream request plan derived from the incoming range.
enum Plan {
    Full,
    Forward(String),
    Partial { range: ByteRange, size: u64 },
}

impl Plan {
    fn upstream_range(&self) -> Option<String> {
        match self {
            Plan::Full => None,
            Plan::Forward(header) => Some(header.clone()),
            Plan::Partial { range, .. } => Some(range.header_value()),
        }
    }
}

#[derive(Clone)]
pub struct ContentProxy {
    drive: DriveClient,
}

impl ContentProxy {
    pub fn new(drive: DriveClient) -> Self {
        Self { drive }
    }

    pub async fn get_metadata(&self, file_id: &str) -> Result<FileMetadata> {
        self.drive.get_metadata(file_id).await
    }

    /// Deliver a file in the requested mode.
    pub async fn deliver(
        &self,
        file_id: &str,
        mode: DeliveryMode,
        range: Option<&str>,
        policy: RangePolicy,
    ) -> Result<ContentResponse> {
        match mode {
            DeliveryMode::DirectLink => self
                .make_public_and_get_links(file_id)
                .await
                .map(ContentResponse::DirectLink),
            DeliveryMode::Stream { disposition } => self
                .stream(file_id, disposition, range, policy)
                .await
                .map(ContentResponse::Stream),
        }
    }

    /// Grant public read access, then return Drive's download and preview
    /// links. The permission is never revoked by this service.
    pub async fn make_public_and_get_links(&self, file_id: &str) -> Result<DirectLinks> {
        let metadata = self.drive.get_metadata(file_id).await?;
        self.drive.share_publicly(file_id).await?;

        Ok(DirectLinks {
            name: metadata.name,
            mime_type: metadata.mime_type,
            size: metadata.size,
            download_url: public_download_url(file_id),
            preview_url: public_preview_url(file_id),
        })
    }

    /// Open the file content and prepare response headers.
    ///
    /// Errors before this returns can still become proper error responses.
    /// Failures while the body is being read only end the stream early.
    pub async fn stream(
        &self,
        file_id: &str,
        disposition: Disposition,
        range: Option<&str>,
        policy: RangePolicy,
    ) -> Result<StreamedContent> {
        let metadata = self.drive.get_metadata(file_id).await?;
        let plan = plan_range(range, metadata.size, policy)?;

        let upstream = self
            .drive
            .open_content(file_id, plan.upstream_range().as_deref())
            .await?;
        let upstream_status = upstream.status();
        let upstream_length = upstream.content_length();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, header_value(&content_type(&metadata)));
        headers.insert(
            CONTENT_DISPOSITION,
            header_value(&content_disposition(disposition, &metadata.name)),
        );
        if policy == RangePolicy::Resolve {
            headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        }

        let status = match plan {
            Plan::Partial { range, size } if upstream_status == StatusCode::PARTIAL_CONTENT => {
                headers.insert(CONTENT_RANGE, header_value(&range.content_range(size)));
                headers.insert(CONTENT_LENGTH, HeaderValue::from(range.content_length()));
                StatusCode::PARTIAL_CONTENT
            }
            Plan::Forward(_) => {
                if let Some(content_range) = upstream.headers().get(CONTENT_RANGE) {
                    headers.insert(CONTENT_RANGE, content_range.clone());
                }
                let length = upstream_length.or(if upstream_status == StatusCode::OK {
                    metadata.size
                } else {
                    None
                });
                if let Some(length) = length {
                    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
                }
                upstream_status
            }
            _ => {
                if let Some(length) = upstream_length.or(metadata.size) {
                    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
                }
                StatusCode::OK
            }
        };

        debug!(file_id, %status, "Streaming file content");

        let id = file_id.to_string();
        let body = upstream
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|e| {
                    warn!(file_id = %id, "Upstream stream failed mid-transfer: {}", e);
                    DriveError::from(e)
                })
            })
            .boxed();

        Ok(StreamedContent {
            status,
            headers,
            body,
        })
    }
}

fn plan_range(range: Option<&str>, size: Option<u64>, policy: RangePolicy) -> Result<Plan> {
    let Some(header) = range else {
        return Ok(Plan::Full);
    };

    match (policy, size) {
        (RangePolicy::Forward, _) | (RangePolicy::Resolve, None) => {
            Ok(Plan::Forward(header.to_string()))
        }
        (RangePolicy::Resolve, Some(size)) => match ByteRange::parse(header, size) {
            Ok(range) => Ok(Plan::Partial { range, size }),
            Err(RangeError::Unsatisfiable) => Err(DriveError::RangeNotSatisfiable { size }),
            Err(RangeError::Malformed) => {
                debug!(range = header, "Ignoring malformed Range header");
                Ok(Plan::Full)
            }
        },
    }
}

fn content_type(metadata: &FileMetadata) -> String {
    metadata
        .mime_type
        .clone()
        .filter(|mime| !mime.is_empty())
        .unwrap_or_else(|| {
            mime_guess::from_path(&metadata.name)
                .first_or_octet_stream()
                .to_string()
        })
}

fn content_disposition(disposition: Disposition, name: &str) -> String {
    let encoded = encode_component(name);
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition.as_str(),
        encoded,
        encoded
    )
}

/// Header values built here are ASCII; fall back to an opaque value otherwise.
fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}
