//! HandleBillingWebhookHandler - Command handler for billing provider webhooks.
//!
//! Pipeline: verify signature, decode event, resolve organization,
//! reconcile subscription state, acknowledge. Any failing stage ends the
//! pipeline with a `WebhookError`; later stages never run.

use std::sync::Arc;

use crate::domain::billing::{
    reconcile, BillingEvent, FailureCategory, Organization, PriceTierMap, SubscriptionChange,
    WebhookError, WebhookVerifier,
};
use crate::domain::foundation::{OrganizationId, Timestamp};
use crate::ports::OrganizationStore;

use super::organization_locator::OrganizationLocator;
use super::organization_locks::OrganizationLocks;

/// Command to handle a billing webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleBillingWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Value of the first signature header present, if any.
    pub signature: Option<String>,
    /// Wall-clock time the request arrived.
    pub received_at: Timestamp,
}

/// Acknowledgement detail of a processed webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The organization's subscription record was written.
    Updated { organization_id: OrganizationId },
    /// The event matched the stored state; nothing was written.
    Unchanged { organization_id: OrganizationId },
    /// Observability-only event (invoices).
    Observed,
    /// Unrecognised event type.
    Ignored { event_type: String },
}

/// Handler for processing billing webhooks.
pub struct HandleBillingWebhookHandler {
    verifier: Arc<WebhookVerifier>,
    prices: Arc<PriceTierMap>,
    store: Arc<dyn OrganizationStore>,
    locks: Arc<OrganizationLocks>,
}

impl HandleBillingWebhookHandler {
    pub fn new(
        verifier: Arc<WebhookVerifier>,
        prices: Arc<PriceTierMap>,
        store: Arc<dyn OrganizationStore>,
        locks: Arc<OrganizationLocks>,
    ) -> Self {
        Self {
            verifier,
            prices,
            store,
            locks,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleBillingWebhookCommand,
    ) -> Result<WebhookOutcome, WebhookError> {
        let result = self.process(cmd).await;

        if let Err(err) = &result {
            match err.category() {
                FailureCategory::Internal => {
                    tracing::error!(code = err.code(), error = %err, "Billing webhook failed")
                }
                _ => tracing::warn!(code = err.code(), error = %err, "Billing webhook rejected"),
            }
        }

        result
    }

    async fn process(
        &self,
        cmd: HandleBillingWebhookCommand,
    ) -> Result<WebhookOutcome, WebhookError> {
        // 1. Authenticate before touching the body
        self.verifier.ensure_configured()?;
        let signature = cmd
            .signature
            .as_deref()
            .ok_or(WebhookError::MissingSignatureHeader)?;
        self.verifier
            .verify(&cmd.payload, signature, cmd.received_at)?;

        // 2. Decode
        let event = BillingEvent::decode(&cmd.payload)?;
        let event_type = event.event_type().to_string();

        // 3. Events without state effects skip resolution
        match &event {
            BillingEvent::Unknown { event_type } => {
                tracing::info!(event_type = %event_type, "Ignoring unrecognised billing event");
                return Ok(WebhookOutcome::Ignored {
                    event_type: event_type.clone(),
                });
            }
            BillingEvent::InvoicePaid(data) | BillingEvent::InvoicePaymentFailed(data) => {
                let invoice = data.invoice.clone().unwrap_or_default();
                tracing::info!(
                    event_type = %event_type,
                    invoice_id = ?invoice.id,
                    customer_id = ?invoice.customer_id,
                    subscription_id = ?invoice.subscription_id,
                    status = ?invoice.status,
                    "Invoice event observed"
                );
                return Ok(WebhookOutcome::Observed);
            }
            _ => {}
        }

        // 4. Resolve the target organization
        let org = self.resolve(&event).await?;

        // 5. Reconcile
        let Some(change) = reconcile(&event, &self.prices)? else {
            return Ok(WebhookOutcome::Observed);
        };

        self.apply(&org.id, &change, &event_type).await
    }

    async fn resolve(&self, event: &BillingEvent) -> Result<Organization, WebhookError> {
        let locator = OrganizationLocator::new(Arc::clone(&self.store));

        match event {
            BillingEvent::CustomerCreated(data) => {
                let hint = data
                    .customer
                    .external_id
                    .as_deref()
                    .filter(|hint| !hint.trim().is_empty())
                    .ok_or(WebhookError::MissingField("customer.externalId"))?;
                locator.locate(None, Some(hint)).await
            }
            _ => {
                let data = event
                    .subscription_data()
                    .ok_or_else(|| WebhookError::MalformedPayload("no subscription data".into()))?;
                locator
                    .locate(Some(&data.subscription.customer_id), data.external_id_hint())
                    .await
            }
        }
    }

    /// Applies one change to an organization's record under its guard.
    async fn apply(
        &self,
        organization_id: &OrganizationId,
        change: &SubscriptionChange,
        event_type: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let _guard = self.locks.acquire(organization_id).await;

        // The store applies the change to its latest copy; the located one may be stale.
        let applied = self
            .store
            .apply_change(organization_id, change)
            .await?
            .ok_or_else(|| WebhookError::OrganizationNotFound(organization_id.to_string()))?;

        if !applied.changed {
            tracing::info!(
                organization_id = %organization_id,
                event_type = %event_type,
                change = change.kind(),
                "Billing event acknowledged, subscription unchanged"
            );
            return Ok(WebhookOutcome::Unchanged {
                organization_id: organization_id.clone(),
            });
        }

        tracing::info!(
            organization_id = %organization_id,
            event_type = %event_type,
            change = change.kind(),
            tier = %applied.subscription.tier,
            status = ?applied.subscription.status,
            "Subscription updated from billing event"
        );

        Ok(WebhookOutcome::Updated {
            organization_id: organization_id.clone(),
        })
    }
}
