//! HTTP DTOs for webhook endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::billing::WebhookError;

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned for every accepted webhook, including ignored types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

impl WebhookAckResponse {
    pub fn received() -> Self {
        Self { received: true }
    }
}

/// Liveness response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Error envelope: `{"error": {"code", "message", "retryable"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Machine-readable error detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Whether the sender should redeliver.
    pub retryable: bool,
}

impl From<&WebhookError> for ErrorResponse {
    fn from(err: &WebhookError) -> Self {
        let message = match err {
            // Internal detail stays in the logs.
            WebhookError::Store(_) => "Internal error".to_string(),
            other => other.to_string(),
        };

        Self {
            error: ErrorBody {
                code: err.code().to_string(),
                message,
                retryable: err.is_retryable(),
            },
        }
    }
}
