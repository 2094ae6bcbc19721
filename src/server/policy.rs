//! Who may download, and from where.

use axum::http::header::{AUTHORIZATION, HOST, REFERER};
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::proxy::DeliveryMode;

/// Reasons a download request is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    /// Anonymous downloads are disabled and no valid credentials were sent.
    Anonymous,
    /// Direct-link protection is on and the Referer is missing or foreign.
    ForeignReferer,
    /// Public links were requested but are disabled.
    PublicLinksDisabled,
}

impl PolicyViolation {
    pub fn explanation(self) -> &'static str {
        match self {
            PolicyViolation::Anonymous => {
                "Anonymous downloads are disabled on this index. Sign in to download files."
            }
            PolicyViolation::ForeignReferer => {
                "Direct links to files are protected. Open the file from the index page instead."
            }
            PolicyViolation::PublicLinksDisabled => {
                "Public sharing links are disabled on this index."
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub disable_anonymous_download: bool,
    /// Accepted `(user, password)` pairs for HTTP Basic authentication.
    pub users: Vec<(String, String)>,
    pub enable_direct_link_protection: bool,
    pub allow_public_links: bool,
}

impl AccessPolicy {
    /// Everything allowed; public links included.
    pub fn open() -> Self {
        Self {
            allow_public_links: true,
            ..Self::default()
        }
    }

    /// Check a download or stream request.
    pub fn check_download(
        &self,
        headers: &HeaderMap,
        mode: DeliveryMode,
    ) -> Result<(), PolicyViolation> {
        if mode == DeliveryMode::DirectLink && !self.allow_public_links {
            return Err(PolicyViolation::PublicLinksDisabled);
        }
        if self.disable_anonymous_download && !self.is_authenticated(headers) {
            return Err(PolicyViolation::Anonymous);
        }
        if self.enable_direct_link_protection && !same_site_referer(headers) {
            return Err(PolicyViolation::ForeignReferer);
        }
        Ok(())
    }

    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        let Some((user, password)) = basic_credentials(headers) else {
            return false;
        };
        self.users
            .iter()
            .any(|(u, p)| *u == user && *p == password)
    }
}

/// Decode `Authorization: Basic <base64(user:password)>`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// The Referer's `host[:port]` must equal the request's Host header.
fn same_site_referer(headers: &HeaderMap) -> bool {
    let Some(host) = headers.get(HOST).and_then(|h| h.to_str().ok()) else {
        return false;
    };
    let Some(referer) = headers.get(REFERER).and_then(|r| r.to_str().ok()) else {
        return false;
    };
    let Ok(url) = reqwest::Url::parse(referer) else {
        return false;
    };
    let Some(referer_host) = url.host_str() else {
        return false;
    };

    let authority = match url.port() {
        Some(port) => format!("{}:{}", referer_host, port),
        None => referer_host.to_string(),
    };
    authority.eq_ignore_ascii_case(host)
}
