//! Billing handlers.
//!
//! Command handler for inbound billing provider webhooks plus the
//! organization resolution and locking it relies on.

mod handle_billing_webhook;
mod organization_locator;
mod organization_locks;

pub use handle_billing_webhook::{
    HandleBillingWebhookCommand, HandleBillingWebhookHandler, WebhookOutcome,
};
pub use organization_locator::OrganizationLocator;
pub use organization_locks::{OrganizationGuard, OrganizationLocks};
