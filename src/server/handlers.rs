//! HTTP handlers for the index API.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::RANGE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::DriveError;
use crate::models::{IssuedToken, Listing};
use crate::proxy::{ContentResponse, DeliveryMode, Disposition, RangePolicy};
use crate::server::error::{ErrorFormat, HttpError};
use crate::server::AppState;
use crate::url_parser::parse_file_id;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesParams {
    pub path: Option<String>,
    pub page_token: Option<String>,
    pub search: Option<String>,
    pub root: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentParams {
    pub file_id: Option<String>,
    /// Only the literal `true` enables a flag; any other value leaves it off.
    pub inline: Option<String>,
    pub direct_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathParams {
    pub file_id: Option<String>,
    pub root: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PathResponse {
    pub path: String,
}

/// `GET /api/auth`
pub async fn auth(State(state): State<AppState>) -> Result<Json<IssuedToken>, HttpError> {
    let token = state
        .drive
        .auth()
        .token()
        .await
        .map_err(|e| HttpError::from_drive(e, ErrorFormat::Json, "Failed to refresh token"))?;

    Ok(Json(IssuedToken {
        expires_in: token.expires_in(),
        access_token: token.value,
    }))
}

/// `GET /api/files`: a search when `search` is set, otherwise a listing of
/// the folder at `path`.
pub async fn files(
    State(state): State<AppState>,
    Query(params): Query<FilesParams>,
) -> Result<Json<Listing>, HttpError> {
    let page_token = params.page_token.as_deref().filter(|t| !t.is_empty());
    let failed = |e: DriveError| HttpError::from_drive(e, ErrorFormat::Json, "Failed to fetch files");

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let listing = state.drive.search(search, page_token).await.map_err(failed)?;
        return Ok(Json(listing));
    }

    let root = state.root(params.root.as_deref())?;
    let path = params.path.as_deref().unwrap_or("/");
    let Some(folder_id) = state.drive.resolve_path(root, path).await else {
        return Err(HttpError::not_found("Folder not found", ErrorFormat::Json));
    };

    let listing = state
        .drive
        .list_children(&folder_id, page_token)
        .await
        .map_err(failed)?;
    Ok(Json(listing))
}

/// `GET /api/download`: ranges are forwarded to Drive as-is.
pub async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ContentParams>,
) -> Result<Response, HttpError> {
    serve_content(
        &state,
        &headers,
        params,
        RangePolicy::Forward,
        ErrorFormat::Html,
        "Failed to download file",
    )
    .await
}

/// `GET /api/stream`: ranges are resolved here and answered with 206.
pub async fn stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ContentParams>,
) -> Result<Response, HttpError> {
    serve_content(
        &state,
        &headers,
        params,
        RangePolicy::Resolve,
        ErrorFormat::Json,
        "Failed to stream file",
    )
    .await
}

/// `GET /api/path`: the virtual path of a file below the selected root.
pub async fn path(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
) -> Result<Json<PathResponse>, HttpError> {
    let file_id = required_file_id(params.file_id.as_deref())?;
    let root = state.root(params.root.as_deref())?;

    let path = state
        .drive
        .path_of(root, &file_id)
        .await
        .map_err(|e| HttpError::from_drive(e, ErrorFormat::Json, "Failed to resolve path"))?;

    Ok(Json(PathResponse {
        path: path.to_string(),
    }))
}

pub async fn method_not_allowed() -> HttpError {
    HttpError::method_not_allowed()
}

fn is_set(flag: Option<&str>) -> bool {
    flag == Some("true")
}

fn required_file_id(raw: Option<&str>) -> Result<String, HttpError> {
    let raw = raw
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| HttpError::bad_request("File ID is required"))?;
    parse_file_id(raw).map_err(|_| HttpError::bad_request("Invalid file ID"))
}

async fn serve_content(
    state: &AppState,
    headers: &HeaderMap,
    params: ContentParams,
    policy: RangePolicy,
    format: ErrorFormat,
    fallback: &str,
) -> Result<Response, HttpError> {
    let file_id = required_file_id(params.file_id.as_deref())?;

    let mode = if is_set(params.direct_link.as_deref()) {
        DeliveryMode::DirectLink
    } else if is_set(params.inline.as_deref()) {
        DeliveryMode::Stream {
            disposition: Disposition::Inline,
        }
    } else {
        DeliveryMode::Stream {
            disposition: Disposition::Attachment,
        }
    };

    state
        .policy
        .check_download(headers, mode)
        .map_err(HttpError::unauthorized)?;

    let range = headers.get(RANGE).and_then(|value| value.to_str().ok());

    let content = state
        .proxy
        .deliver(&file_id, mode, range, policy)
        .await
        .map_err(|e| HttpError::from_drive(e, format, fallback))?;

    Ok(match content {
        ContentResponse::DirectLink(links) => Json(links).into_response(),
        ContentResponse::Stream(content) => {
            let mut response = Response::new(Body::from_stream(content.body));
            *response.status_mut() = content.status;
            *response.headers_mut() = content.headers;
            response
        }
    })
}
