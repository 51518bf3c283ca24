//! HTTP surface for racedash.
//!
//! Two API routes plus a health probe:
//!
//! | Method | Path          | Handler              |
//! |--------|---------------|----------------------|
//! | POST   | `/api/upload` | [`handlers::upload`] |
//! | GET    | `/api/races`  | [`handlers::races`]  |
//! | GET    | `/health`     | [`handlers::health`] |
//!
//! All handlers share one [`AppState`], built by the caller and handed to
//! [`router`].

pub mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{Config, CorsConfig};
use crate::error::{Error, Result};
use crate::store::{MemoryStore, RaceDataRepository};

/// State shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    store: Arc<dyn RaceDataRepository>,
}

impl AppState {
    /// Create state backed by the given repository.
    #[must_use]
    pub fn new(store: Arc<dyn RaceDataRepository>) -> Self {
        Self { store }
    }

    /// Create state backed by a fresh, empty [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// The race data repository.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RaceDataRepository> {
        &self.store
    }
}

/// Build the application router.
#[must_use]
pub fn router(state: AppState, config: &Config) -> Router {
    let app = Router::new()
        .route("/api/upload", post(handlers::upload))
        .route("/api/races", get(handlers::races))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.cors.enabled {
        app.layer(cors_layer(&config.cors))
    } else {
        app
    }
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origin = if cors.allows_any_origin() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            cors.allowed_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
}

/// Bind the configured address and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr = config.server.bind_addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;

    serve_with_shutdown(listener, config, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    config: &Config,
    state: AppState,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    info!("racedash listening on http://{}", local_addr);

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::server(e.to_string()))?;

    info!("racedash server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
