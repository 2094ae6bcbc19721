//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use crate::auth::{Credentials, TokenProvider};
use crate::client::{DriveClient, ListingOptions, DRIVE_API_BASE};
use crate::error::{DriveError, Result};
use crate::query::SearchMode;
use crate::server::policy::AccessPolicy;

/// Drive credentials, roots and listing behavior.
#[derive(Args, Debug, Clone)]
pub struct DriveArgs {
    /// OAuth client ID used for the refresh-token grant.
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret used for the refresh-token grant.
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Long-lived OAuth refresh token.
    #[arg(long, env = "GOOGLE_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Service account JSON key, used instead of the refresh token when set.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub service_account: Option<PathBuf>,

    /// Root folder IDs (or folder URLs); the first one is the default root.
    #[arg(long = "root", env = "DRIVE_ROOTS", value_delimiter = ',', required = true)]
    pub roots: Vec<String>,

    /// Page size for directory listings.
    #[arg(long, env = "FILES_LIST_PAGE_SIZE", default_value_t = 100)]
    pub files_list_page_size: u32,

    /// Page size for search results.
    #[arg(long, env = "SEARCH_RESULT_LIST_PAGE_SIZE", default_value_t = 100)]
    pub search_result_list_page_size: u32,

    /// Search shared drives as well as "My Drive".
    #[arg(long, env = "SEARCH_ALL_DRIVES")]
    pub search_all_drives: bool,

    /// Match search words against file names or full text.
    #[arg(long, env = "SEARCH_MODE", value_enum, default_value_t = SearchMode::Name)]
    pub search_mode: SearchMode,

    #[arg(long, env = "DRIVE_API_BASE", default_value = DRIVE_API_BASE, hide = true)]
    pub api_base: String,

    #[arg(long, env = "OAUTH_TOKEN_URI", hide = true)]
    pub token_uri: Option<String>,
}

impl DriveArgs {
    /// Pick the credential source: a service account key wins over the
    /// refresh-token triple.
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(path) = &self.service_account {
            return Credentials::service_account_file(path);
        }

        match (&self.client_id, &self.client_secret, &self.refresh_token) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Ok(Credentials::RefreshToken {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    refresh_token: refresh_token.clone(),
                })
            }
            _ => Err(DriveError::MissingCredentials(
                "set GOOGLE_APPLICATION_CREDENTIALS or all of GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN".to_string(),
            )),
        }
    }

    /// Root folder IDs, with folder URLs reduced to their IDs.
    pub fn root_ids(&self) -> Result<Vec<String>> {
        self.roots
            .iter()
            .map(|root| crate::url_parser::parse_file_id(root))
            .collect()
    }

    pub fn listing_options(&self) -> ListingOptions {
        ListingOptions {
            files_list_page_size: self.files_list_page_size,
            search_result_list_page_size: self.search_result_list_page_size,
            search_all_drives: self.search_all_drives,
            search_mode: self.search_mode,
        }
    }

    /// Build the Drive client described by these arguments.
    pub fn connect(&self) -> Result<DriveClient> {
        let mut auth = TokenProvider::new(self.credentials()?);
        if let Some(token_uri) = &self.token_uri {
            auth = auth.with_token_uri(token_uri.clone());
        }

        Ok(DriveClient::new(auth, self.listing_options()).with_api_base(self.api_base.clone()))
    }
}

/// HTTP listener and download policy.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address the HTTP API listens on.
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Send CORS headers on download and stream responses.
    #[arg(long, env = "ENABLE_CORS_FILE_DOWN")]
    pub enable_cors_file_down: bool,

    /// Require HTTP Basic credentials for downloads.
    #[arg(long, env = "DISABLE_ANONYMOUS_DOWNLOAD")]
    pub disable_anonymous_download: bool,

    /// Accepted `user:password` pairs for downloads.
    #[arg(long = "user", env = "DOWNLOAD_USERS", value_delimiter = ',', hide_env_values = true)]
    pub users: Vec<String>,

    /// Reject downloads whose Referer is not this site.
    #[arg(long, env = "ENABLE_DIRECT_LINK_PROTECTION")]
    pub enable_direct_link_protection: bool,

    /// Refuse `directLink=true`, which makes files publicly readable.
    #[arg(long, env = "DISABLE_PUBLIC_LINKS")]
    pub disable_public_links: bool,
}

impl ServeArgs {
    pub fn access_policy(&self) -> Result<AccessPolicy> {
        let users = self
            .users
            .iter()
            .map(|pair| {
                pair.split_once(':')
                    .map(|(user, password)| (user.to_string(), password.to_string()))
                    .ok_or_else(|| {
                        DriveError::MissingCredentials(format!(
                            "download user entry without ':' separator: {}",
                            pair.split(':').next().unwrap_or_default()
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AccessPolicy {
            disable_anonymous_download: self.disable_anonymous_download,
            users,
            enable_direct_link_protection: self.enable_direct_link_protection,
            allow_public_links: !self.disable_public_links,
        })
    }
}
