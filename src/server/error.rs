//! Mapping of failures to HTTP responses.

use axum::http::header::{CONTENT_RANGE, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::DriveError;
use crate::server::policy::PolicyViolation;

/// Body style of error responses for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    Html,
    Json,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    format: ErrorFormat,
    headers: Vec<(axum::http::HeaderName, HeaderValue)>,
}

impl HttpError {
    fn new(status: StatusCode, message: impl Into<String>, format: ErrorFormat) -> Self {
        Self {
            status,
            message: message.into(),
            format,
            headers: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, ErrorFormat::Json)
    }

    pub fn not_found(message: impl Into<String>, format: ErrorFormat) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, format)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", ErrorFormat::Json)
    }

    pub fn unauthorized(violation: PolicyViolation) -> Self {
        let mut err = Self::new(StatusCode::UNAUTHORIZED, violation.explanation(), ErrorFormat::Html);
        if violation == PolicyViolation::Anonymous {
            err.headers.push((
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"drive-index\""),
            ));
        }
        err
    }

    /// Translate a library error; anything but "not found" and range errors
    /// becomes a generic 500 with `fallback` as the message.
    pub fn from_drive(err: DriveError, format: ErrorFormat, fallback: &str) -> Self {
        if err.is_not_found() {
            return Self::not_found("File not found", format);
        }
        match err {
            DriveError::RangeNotSatisfiable { size } => {
                let mut http = Self::new(
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    "Requested range not satisfiable",
                    ErrorFormat::Json,
                );
                if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", size)) {
                    http.headers.push((CONTENT_RANGE, value));
                }
                http
            }
            DriveError::InvalidUrlOrId(id) => Self::bad_request(format!("Invalid file ID: {}", id)),
            other => {
                error!("{}: {}", fallback, other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, fallback, ErrorFormat::Json)
            }
        }
    }
}

fn html_page(status: StatusCode, message: &str) -> String {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    format!(
        "<html>\n  <head><title>{title}</title></head>\n  <body>\n    <h1>{title}</h1>\n    <p>{message}</p>\n  </body>\n</html>\n"
    )
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = match self.format {
            ErrorFormat::Json => (self.status, Json(json!({ "error": self.message }))).into_response(),
            ErrorFormat::Html => {
                let message = if self.status == StatusCode::NOT_FOUND {
                    "The requested file could not be found."
                } else {
                    self.message.as_str()
                };
                (self.status, Html(html_page(self.status, message))).into_response()
            }
        };
        for (name, value) in self.headers {
            response.headers_mut().insert(name, value);
        }
        response
    }
}
