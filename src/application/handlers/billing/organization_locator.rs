//! OrganizationLocator - Resolves the organization a billing event targets.

use std::sync::Arc;

use crate::domain::billing::{Organization, WebhookError};
use crate::domain::foundation::OrganizationId;
use crate::ports::OrganizationStore;

/// Fetch one extra row so duplicate customer links can be detected.
const CUSTOMER_LOOKUP_LIMIT: usize = 2;

/// Two-step organization resolution.
///
/// 1. By linked provider customer id.
/// 2. By the customer-level external id hint, used as the primary key.
pub struct OrganizationLocator {
    store: Arc<dyn OrganizationStore>,
}

impl OrganizationLocator {
    pub fn new(store: Arc<dyn OrganizationStore>) -> Self {
        Self { store }
    }

    /// Resolves exactly one organization or fails with `OrganizationNotFound`.
    pub async fn locate(
        &self,
        customer_id: Option<&str>,
        external_id_hint: Option<&str>,
    ) -> Result<Organization, WebhookError> {
        if let Some(customer_id) = customer_id {
            if let Some(org) = self.by_customer_id(customer_id).await? {
                return Ok(org);
            }
        }

        if let Some(hint) = external_id_hint {
            if let Some(org) = self.by_external_id(hint).await? {
                return Ok(org);
            }
        }

        let lookup = match (customer_id, external_id_hint) {
            (Some(customer), Some(hint)) => format!("customer {} or external id {}", customer, hint),
            (Some(customer), None) => format!("customer {}", customer),
            (None, Some(hint)) => format!("external id {}", hint),
            (None, None) => "event without customer reference".to_string(),
        };
        tracing::warn!(lookup = %lookup, "No organization matches billing event");
        Err(WebhookError::OrganizationNotFound(lookup))
    }

    async fn by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Organization>, WebhookError> {
        let mut matches = self
            .store
            .find_by_customer_id(customer_id, CUSTOMER_LOOKUP_LIMIT)
            .await?;

        if matches.len() > 1 {
            tracing::error!(
                customer_id = %customer_id,
                chosen = %matches[0].id,
                other = %matches[1].id,
                "Multiple organizations linked to one customer, using the first"
            );
        }

        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(matches.swap_remove(0)))
    }

    async fn by_external_id(&self, hint: &str) -> Result<Option<Organization>, WebhookError> {
        let Ok(id) = OrganizationId::new(hint) else {
            return Ok(None);
        };
        let org = self.store.find_by_id(&id).await?;
        if org.is_some() {
            tracing::debug!(organization_id = %id, "Organization resolved by external id hint");
        }
        Ok(org)
    }
}
