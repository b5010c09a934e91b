//! Maps billing events to subscription changes.
//!
//! Driven by event type rather than a transition table: the provider owns
//! the subscription state machine and this module mirrors its outcome.

use super::billing_event::{BillingEvent, SubscriptionEventData};
use super::subscription::SubscriptionChange;
use super::tier::BillingInterval;
use super::tier_resolver::PriceTierMap;
use super::webhook_errors::WebhookError;

/// Derives the change an event implies, if any.
///
/// Returns `Ok(None)` for events that never mutate state (invoices and
/// unrecognised types).
///
/// # Errors
///
/// - `MissingField` when a field the change needs is absent
/// - `UnknownPrice` when strict price mapping rejects the price id
pub fn reconcile(
    event: &BillingEvent,
    prices: &PriceTierMap,
) -> Result<Option<SubscriptionChange>, WebhookError> {
    let change = match event {
        BillingEvent::SubscriptionCreated(data)
        | BillingEvent::SubscriptionUpdated(data)
        | BillingEvent::SubscriptionActivated(data) => activate(data, prices)?,
        BillingEvent::SubscriptionCanceled(data) => downgrade(data, "canceled"),
        BillingEvent::SubscriptionExpired(data) => downgrade(data, "expired"),
        BillingEvent::CustomerCreated(data) => {
            let external_customer_id = data
                .customer
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .ok_or(WebhookError::MissingField("customer.id"))?;
            SubscriptionChange::LinkCustomer {
                external_customer_id,
            }
        }
        BillingEvent::InvoicePaid(_)
        | BillingEvent::InvoicePaymentFailed(_)
        | BillingEvent::Unknown { .. } => return Ok(None),
    };

    Ok(Some(change))
}

fn activate(
    data: &SubscriptionEventData,
    prices: &PriceTierMap,
) -> Result<SubscriptionChange, WebhookError> {
    let subscription = &data.subscription;
    let status = subscription
        .status
        .clone()
        .ok_or(WebhookError::MissingField("subscription.status"))?;
    let price_id = subscription
        .price_id
        .as_deref()
        .ok_or(WebhookError::MissingField("subscription.priceId"))?;

    Ok(SubscriptionChange::Activate {
        tier: prices.resolve(price_id)?,
        status,
        billing_interval: BillingInterval::from_discriminator(subscription.interval.as_deref()),
        external_customer_id: subscription.customer_id.clone(),
        external_subscription_id: subscription.id.clone(),
        trial_end: subscription.trial_end,
    })
}

fn downgrade(data: &SubscriptionEventData, default_status: &str) -> SubscriptionChange {
    SubscriptionChange::Downgrade {
        status: data
            .subscription
            .status
            .clone()
            .unwrap_or_else(|| default_status.to_string()),
    }
}
