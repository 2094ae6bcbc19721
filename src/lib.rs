//! drive_index - a web index over Google Drive folders.
//!
//! This library provides:
//! - Access tokens from a refresh token or a service account, cached in memory
//! - Folder listings, name search and path resolution below configured roots
//! - A content proxy that streams files (with byte ranges) or hands out
//!   public Drive links
//! - An axum HTTP API tying the above together
//!
//! # Example
//!
//! ```no_run
//! use drive_index::{Credentials, DriveClient, ListingOptions, TokenProvider};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = TokenProvider::new(Credentials::service_account_file("service-account.json")?);
//!     let client = DriveClient::new(auth, ListingOptions::default());
//!
//!     if let Some(folder_id) = client.resolve_path("root-folder-id", "/CourseA/Week1").await {
//!         for file in client.list_children(&folder_id, None).await?.files {
//!             println!("{}", file);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod path;
pub mod proxy;
pub mod query;
pub mod range;
pub mod server;
pub mod url_parser;

// Re-exports for convenience
pub use auth::{AccessToken, Credentials, TokenProvider};
pub use client::{DriveClient, ListingOptions};
pub use error::{DriveError, Result};
pub use models::{DirectLinks, FileEntry, FileMetadata, Listing};
pub use path::VirtualPath;
pub use proxy::{ContentProxy, ContentResponse, DeliveryMode, Disposition, RangePolicy};
pub use url_parser::parse_file_id;
