//! Billing domain module.
//!
//! Verifies, decodes and reconciles billing webhook events against an
//! organization's subscription record.
//!
//! # Module Structure
//!
//! - `webhook_verifier` - Signature header parsing and HMAC verification
//! - `billing_event` - Typed webhook events
//! - `tier` - Subscription tiers and billing intervals
//! - `tier_resolver` - Price id to tier catalog
//! - `subscription` - Subscription record and its transitions
//! - `reconciler` - Event to transition mapping

mod billing_event;
mod reconciler;
mod subscription;
mod tier;
mod tier_resolver;
mod webhook_errors;
mod webhook_verifier;

pub use billing_event::{
    BillingEvent, BillingEventType, CustomerEventData, CustomerPayload, EventEnvelope,
    InvoiceEventData, InvoicePayload, SubscriptionEventData, SubscriptionPayload,
};
pub use reconciler::reconcile;
pub use subscription::{Organization, SubscriptionChange, SubscriptionRecord};
pub use tier::{BillingInterval, SubscriptionTier};
pub use tier_resolver::{PriceTierMap, FALLBACK_TIER};
pub use webhook_errors::{FailureCategory, WebhookError};
pub use webhook_verifier::{
    compute_signature, signature_entry, EntryRejection, SignatureEntry, SignatureHeader,
    VerifiedSignature, WebhookVerifier, DEFAULT_TOLERANCE_SECS, SIGNATURE_VERSION,
};

