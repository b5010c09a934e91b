//! HTTP handlers for webhook endpoints.
//!
//! These handlers connect axum routes to the application layer command handler.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use super::dto::{ErrorResponse, HealthResponse, WebhookAckResponse};
use crate::application::handlers::billing::{
    HandleBillingWebhookCommand, HandleBillingWebhookHandler, OrganizationLocks, WebhookOutcome,
};
use crate::domain::billing::{PriceTierMap, WebhookError, WebhookVerifier};
use crate::domain::foundation::Timestamp;
use crate::ports::OrganizationStore;

/// Signature headers in lookup order; the first one present is used.
pub const SIGNATURE_HEADERS: [&str; 3] =
    ["x-flowglad-signature", "svix-signature", "x-svix-signature"];

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state for webhook handlers.
///
/// Contains all dependencies needed by the webhook command handler.
#[derive(Clone)]
pub struct WebhookAppState {
    pub verifier: Arc<WebhookVerifier>,
    pub prices: Arc<PriceTierMap>,
    pub store: Arc<dyn OrganizationStore>,
    pub locks: Arc<OrganizationLocks>,
}

impl WebhookAppState {
    pub fn new(
        verifier: WebhookVerifier,
        prices: PriceTierMap,
        store: Arc<dyn OrganizationStore>,
    ) -> Self {
        Self {
            verifier: Arc::new(verifier),
            prices: Arc::new(prices),
            store,
            locks: Arc::new(OrganizationLocks::new()),
        }
    }

    /// Create the command handler on demand from the shared state.
    pub fn webhook_handler(&self) -> HandleBillingWebhookHandler {
        HandleBillingWebhookHandler::new(
            self.verifier.clone(),
            self.prices.clone(),
            self.store.clone(),
            self.locks.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/flowglad - Handle billing provider webhooks
///
/// The body is taken as raw bytes so the signature is checked against
/// exactly what was sent.
pub async fn handle_flowglad_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let handler = state.webhook_handler();
    let cmd = HandleBillingWebhookCommand {
        payload: body.to_vec(),
        signature: signature_header(&headers),
        received_at: Timestamp::now(),
    };

    let outcome = handler.handle(cmd).await?;

    match &outcome {
        WebhookOutcome::Updated { organization_id }
        | WebhookOutcome::Unchanged { organization_id } => {
            tracing::info!(
                organization_id = %organization_id,
                outcome = ?outcome,
                "Webhook acknowledged"
            );
        }
        _ => tracing::info!(outcome = ?outcome, "Webhook acknowledged"),
    }

    Ok((StatusCode::OK, Json(WebhookAckResponse::received())))
}

/// GET /health - Liveness check
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::ok())
}

/// Returns the first signature header present.
///
/// Non-ASCII bytes are passed through lossily so header validation
/// reports them as malformed.
fn signature_header(headers: &HeaderMap) -> Option<String> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(pub WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        let body = ErrorResponse::from(&self.0);
        (status, Json(body)).into_response()
    }
}
