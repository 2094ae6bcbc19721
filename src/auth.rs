//! Access-token provider for Google APIs.
//!
//! Tokens come either from an OAuth refresh-token grant or from a service
//! account JWT assertion, and are cached in memory until shortly before they
//! expire.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, ServiceAccountCredentials, TokenResponse};

/// Google OAuth2 token endpoint.
pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google Drive API scope.
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// How long a freshly issued token is trusted, a little under Google's hour.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(3500);

/// JWT claims for service account authentication.
#[derive(Debug, Serialize)]
struct Claims {
    iss: String,   // Issuer (service account email)
    scope: String, // OAuth scope
    aud: String,   // Audience (token endpoint)
    exp: u64,      // Expiration time
    iat: u64,      // Issued at
}

/// The long-lived credential exchanged for access tokens.
pub enum Credentials {
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
    ServiceAccount(ServiceAccountCredentials),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::RefreshToken { client_id, .. } => f
                .debug_struct("RefreshToken")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credentials::ServiceAccount(sa) => f
                .debug_struct("ServiceAccount")
                .field("client_email", &sa.client_email)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    /// Load service account credentials from a JSON key file.
    pub fn service_account_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let credentials: ServiceAccountCredentials = serde_json::from_str(&content)?;
        Ok(Credentials::ServiceAccount(credentials))
    }
}

/// A bearer token and the instant it stops being served from cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: SystemTime,
}

impl AccessToken {
    pub fn is_fresh(&self) -> bool {
        SystemTime::now() < self.expires_at
    }

    /// Whole seconds left before the token is considered stale.
    pub fn expires_in(&self) -> u64 {
        self.expires_at
            .duration_since(SystemTime::now())
            .map(|left| left.as_secs())
            .unwrap_or(0)
    }
}

/// Issues bearer tokens for Drive requests, sharing one cache across clones.
///
/// Concurrent callers that find the cache stale each refresh; the last write
/// wins. Refreshing is idempotent so no single-flight is attempted.
#[derive(Clone)]
pub struct TokenProvider {
    credentials: Arc<Credentials>,
    token_uri: String,
    lifetime: Duration,
    client: Client,
    cached_token: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenProvider {
    /// Create a new provider from credentials.
    pub fn new(credentials: Credentials) -> Self {
        let token_uri = match &credentials {
            Credentials::ServiceAccount(sa) => sa.token_uri.clone(),
            Credentials::RefreshToken { .. } => None,
        }
        .unwrap_or_else(|| TOKEN_URI.to_string());

        Self {
            credentials: Arc::new(credentials),
            token_uri,
            lifetime: TOKEN_LIFETIME,
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Override the OAuth token endpoint.
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Override how long issued tokens are cached.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String> {
        Ok(self.token().await?.value)
    }

    /// Get the cached token, or replace it with a freshly issued one.
    pub async fn token(&self) -> Result<AccessToken> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.clone());
            }
        }

        let new_token = self.refresh_token().await?;

        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(new_token.clone());
        }

        Ok(new_token)
    }

    async fn refresh_token(&self) -> Result<AccessToken> {
        let request = match self.credentials.as_ref() {
            Credentials::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            } => {
                info!("Refreshing access token with refresh-token grant");
                self.client.post(&self.token_uri).form(&[
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ])
            }
            Credentials::ServiceAccount(sa) => {
                info!(account = %sa.client_email, "Refreshing access token with service account");
                let jwt = self.service_account_assertion(sa)?;
                self.client.post(&self.token_uri).form(&[
                    ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                    ("assertion", jwt.as_str()),
                ])
            }
        };

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(DriveError::TokenRefreshError(format!(
                "Status {}: {}",
                status, message
            )));
        }

        let token_response: TokenResponse = response.json().await?;

        let lifetime = token_response
            .expires_in
            .map(|secs| Duration::from_secs(secs).min(self.lifetime))
            .unwrap_or(self.lifetime);
        debug!(lifetime_secs = lifetime.as_secs(), "Caching access token");

        Ok(AccessToken {
            value: token_response.access_token,
            expires_at: SystemTime::now() + lifetime,
        })
    }

    fn service_account_assertion(&self, sa: &ServiceAccountCredentials) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DriveError::TokenRefreshError(e.to_string()))?
            .as_secs();

        let claims = Claims {
            iss: sa.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(sa.private_key.as_bytes())?;
        Ok(encode(&header, &claims, &key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_serialization() {
        let claims = Claims {
            iss: "indexer@example.iam.gserviceaccount.com".to_string(),
            scope: DRIVE_SCOPE.to_string(),
            aud: TOKEN_URI.to_string(),
            iat: 1234567890,
            exp: 1234571490,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("indexer@example.iam.gserviceaccount.com"));
        assert!(json.contains(DRIVE_SCOPE));
    }

    #[test]
    fn test_access_token_freshness() {
        let fresh = AccessToken {
            value: "tok".to_string(),
            expires_at: SystemTime::now() + Duration::from_secs(120),
        };
        assert!(fresh.is_fresh());
        assert!(fresh.expires_in() > 100);

        let stale = AccessToken {
            value: "tok".to_string(),
            expires_at: SystemTime::now() - Duration::from_secs(1),
        };
        assert!(!stale.is_fresh());
        assert_eq!(stale.expires_in(), 0);
    }

    #[test]
    fn test_service_account_token_uri_is_used() {
        let provider = TokenProvider::new(Credentials::ServiceAccount(ServiceAccountCredentials {
            client_email: "sa@example.com".to_string(),
            private_key: "key".to_string(),
            token_uri: Some("https://example.com/token".to_string()),
        }));
        assert_eq!(provider.token_uri, "https://example.com/token");
    }
}
