//! HTTP API for the table gate.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{client_ip, logging_middleware};
pub use types::*;

use crate::config::Config;
use crate::registration::RegistrationWorkflow;
use axum::{
    http::{header::CONTENT_TYPE, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Admission pipeline and staff actions
    pub workflow: Arc<RegistrationWorkflow>,
    /// Loaded configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(workflow: RegistrationWorkflow, config: Config) -> Self {
        Self {
            workflow: Arc::new(workflow),
            config: Arc::new(config),
        }
    }
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/qr-urls", get(handlers::qr_urls))
        // Customer flow
        .route("/scan/:table", get(handlers::scan))
        .route("/register", post(handlers::register))
        // Bot and ordering system
        .route("/api/session/validate/:phone", get(handlers::validate_session))
        .route("/api/session/status/:phone", put(handlers::update_status))
        .route("/api/session/end/:phone", delete(handlers::end_session))
        .route("/api/session/config", get(handlers::public_config))
        // Staff
        .route("/api/admin/sessions", get(handlers::list_sessions))
        .route("/api/admin/table-status", get(handlers::table_status))
        .route("/api/admin/approve/:phone", post(handlers::approve))
        .route("/api/admin/reject/:phone", post(handlers::reject))
        .route(
            "/api/admin/block/:phone",
            post(handlers::block).delete(handlers::unblock),
        )
        .route("/api/admin/blocked", get(handlers::list_blocked))
        .route("/api/admin/end-session/:phone", post(handlers::force_end_session))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
