//! Error types for the drive_index crate.

use thiserror::Error;

/// Errors that can occur when talking to Google Drive or serving its content.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Failed to read credentials file: {0}")]
    CredentialsFileError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid URL or ID: {0}")]
    InvalidUrlOrId(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Requested range not satisfiable for {size} bytes")]
    RangeNotSatisfiable { size: u64 },

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),
}

impl DriveError {
    /// Whether this error means the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DriveError::FileNotFound(_) | DriveError::ApiError { status: 404, .. }
        )
    }
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
