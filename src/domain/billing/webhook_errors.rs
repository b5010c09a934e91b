//! Webhook error types for billing webhook handling.
//!
//! Defines every way an inbound billing event can be rejected, grouped into
//! four failure categories with HTTP status code mapping and retryability
//! semantics for the event sender.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Coarse classification of a webhook rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// Bad, missing or expired signature.
    Authentication,
    /// Malformed body or headers.
    Validation,
    /// The event could not be tied to an organization.
    Resolution,
    /// Misconfiguration or an unavailable collaborator.
    Internal,
}

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No signing secret is configured on this server.
    #[error("Webhook signing secret is not configured")]
    MissingSecret,

    /// None of the accepted signature headers was present.
    #[error("Missing signature header")]
    MissingSignatureHeader,

    /// The signature header could not be parsed into any entry.
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// No signature entry passed version, freshness and HMAC checks.
    #[error("No valid signature")]
    NoValidSignature,

    /// The verified body is not a decodable event envelope.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A field required by this event type is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// No organization matched the event's customer id or external id hint.
    #[error("Organization not found for {0}")]
    OrganizationNotFound(String),

    /// A price id has no tier mapping and strict mapping is enabled.
    #[error("Unknown price id: {0}")]
    UnknownPrice(String),

    /// The organization store failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl WebhookError {
    /// Returns the failure category for this error.
    pub fn category(&self) -> FailureCategory {
        match self {
            WebhookError::MissingSignatureHeader | WebhookError::NoValidSignature => {
                FailureCategory::Authentication
            }
            WebhookError::MalformedHeader(_)
            | WebhookError::MalformedPayload(_)
            | WebhookError::MissingField(_) => FailureCategory::Validation,
            WebhookError::OrganizationNotFound(_) => FailureCategory::Resolution,
            WebhookError::MissingSecret
            | WebhookError::UnknownPrice(_)
            | WebhookError::Store(_) => FailureCategory::Internal,
        }
    }

    /// Returns true if the sender should retry delivering this webhook.
    ///
    /// Resolution failures are retryable because the organization may not
    /// exist yet when the provider's events race account creation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            FailureCategory::Resolution | FailureCategory::Internal
        )
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self.category() {
            FailureCategory::Authentication => StatusCode::UNAUTHORIZED,
            FailureCategory::Validation => StatusCode::BAD_REQUEST,
            FailureCategory::Resolution => StatusCode::NOT_FOUND,
            FailureCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code returned in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingSecret => "MISSING_SECRET",
            WebhookError::MissingSignatureHeader => "MISSING_SIGNATURE_HEADER",
            WebhookError::MalformedHeader(_) => "MALFORMED_HEADER",
            WebhookError::NoValidSignature => "NO_VALID_SIGNATURE",
            WebhookError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::OrganizationNotFound(_) => "ORGANIZATION_NOT_FOUND",
            WebhookError::UnknownPrice(_) => "UNKNOWN_PRICE",
            WebhookError::Store(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Store(err.to_string())
    }
}
