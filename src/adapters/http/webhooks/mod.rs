//! HTTP adapter for billing webhook endpoints.
//!
//! - `POST /api/webhooks/flowglad` - Verified billing provider webhooks
//! - `GET /health` - Liveness check

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorBody, ErrorResponse, HealthResponse, WebhookAckResponse};
pub use handlers::{WebhookApiError, WebhookAppState, SIGNATURE_HEADERS};
pub use routes::{webhook_router, webhook_routes, HttpLimits};
