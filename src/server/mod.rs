//! HTTP API in front of the Drive client.

pub mod error;
pub mod handlers;
pub mod policy;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header::{ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::client::DriveClient;
use crate::proxy::ContentProxy;
use crate::server::error::{ErrorFormat, HttpError};
use crate::server::policy::AccessPolicy;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub drive: DriveClient,
    pub proxy: ContentProxy,
    /// Configured root folder IDs; index 0 is the default.
    pub roots: Arc<[String]>,
    pub policy: Arc<AccessPolicy>,
}

impl AppState {
    pub fn new(drive: DriveClient, roots: Vec<String>, policy: AccessPolicy) -> Self {
        Self {
            proxy: ContentProxy::new(drive.clone()),
            drive,
            roots: roots.into(),
            policy: Arc::new(policy),
        }
    }

    /// Look up a root by its index as sent in the query string. A missing or
    /// empty value selects the first root; anything that is not a known
    /// index is "Root not found".
    pub fn root(&self, index: Option<&str>) -> Result<&str, HttpError> {
        let index = match index.map(str::trim).filter(|i| !i.is_empty()) {
            None => Some(0),
            Some(raw) => raw.parse::<usize>().ok(),
        };
        index
            .and_then(|i| self.roots.get(i))
            .map(String::as_str)
            .ok_or_else(|| HttpError::not_found("Root not found", ErrorFormat::Json))
    }
}

/// Build the API router. CORS headers are only added to the download and
/// stream routes, and only when enabled.
pub fn router(state: AppState, enable_cors_file_down: bool) -> Router {
    let mut downloads = Router::new()
        .route(
            "/api/download",
            get(handlers::download).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/stream",
            get(handlers::stream).fallback(handlers::method_not_allowed),
        );
    if enable_cors_file_down {
        downloads = downloads.layer(cors_layer());
    }

    Router::new()
        .route("/api/auth", get(handlers::auth).fallback(handlers::method_not_allowed))
        .route("/api/files", get(handlers::files).fallback(handlers::method_not_allowed))
        .route("/api/path", get(handlers::path).fallback(handlers::method_not_allowed))
        .merge(downloads)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([RANGE])
        .expose_headers([CONTENT_RANGE, CONTENT_LENGTH, ACCEPT_RANGES, CONTENT_DISPOSITION])
}

/// Bind `listen` and serve until Ctrl-C.
pub async fn serve(listen: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!("Drive index listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
