//! Pepper bridge library logic.
//!
//! The bridge is the only process that holds a legacy session. It exposes
//! that session to remote callers over a small JSON HTTP surface:
//!
//! | Method & path     | Success                                   | Failure |
//! |-------------------|-------------------------------------------|---------|
//! | `GET /`           | name, version, endpoints                  | —       |
//! | `GET /status`     | `{status, connected, target_host, ...}`   | never   |
//! | `POST /speak`     | `{status:"ok", spoken:true}`              | 400 / 500 |
//! | `POST /reconnect` | `{status:"ok", connected:true}`           | 500     |
//! | anything else     | —                                         | 404     |

pub mod api;
pub mod config;
pub mod middleware;
pub mod session;

pub use session::SessionManager;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Maximum request body size (1 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The bridge's single legacy session.
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index_handler))
        .route("/status", get(api::status_handler))
        .route("/speak", post(api::speak_handler))
        .route("/reconnect", post(api::reconnect_handler))
        .fallback(api::not_found_handler)
        .method_not_allowed_fallback(api::not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::cors_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
