//! Axum router configuration for webhook endpoints.

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers::{handle_flowglad_webhook, health, WebhookAppState};

/// Transport limits applied to every request.
#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    /// Bounded wait for the whole request.
    pub request_timeout: Duration,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_bytes: 256 * 1024,
        }
    }
}

/// Create the webhook router.
///
/// # Routes
/// - `POST /flowglad` - Handle billing provider webhooks (signature verified)
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/flowglad", post(handle_flowglad_webhook))
}

/// Create the complete service router.
///
/// # Routes
/// - `POST /api/webhooks/flowglad`
/// - `GET /health`
pub fn webhook_router(state: WebhookAppState, limits: HttpLimits) -> Router {
    Router::new()
        .nest("/api/webhooks", webhook_routes())
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(limits.max_body_bytes))
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
