//! In-Memory Organization Store Adapter
//!
//! Stores organizations in memory.
//! Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{Organization, SubscriptionChange, SubscriptionRecord};
use crate::domain::foundation::{DomainError, ErrorCode, OrganizationId};
use crate::ports::{AppliedChange, OrganizationStore};

/// In-memory storage for organizations
#[derive(Debug, Clone)]
pub struct InMemoryOrganizationStore {
    organizations: Arc<RwLock<HashMap<OrganizationId, Organization>>>,
}

impl InMemoryOrganizationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            organizations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace organizations
    pub async fn seed(&self, organizations: impl IntoIterator<Item = Organization>) {
        let mut stored = self.organizations.write().await;
        for org in organizations {
            stored.insert(org.id.clone(), org);
        }
    }

    /// Snapshot of one organization
    pub async fn get(&self, id: &OrganizationId) -> Option<Organization> {
        self.organizations.read().await.get(id).cloned()
    }

    /// Get the number of stored organizations
    pub async fn len(&self) -> usize {
        self.organizations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.organizations.read().await.is_empty()
    }
}

impl Default for InMemoryOrganizationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrganizationStore for InMemoryOrganizationStore {
    async fn find_by_customer_id(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<Organization>, DomainError> {
        let organizations = self.organizations.read().await;
        let mut matches: Vec<Organization> = organizations
            .values()
            .filter(|org| org.subscription.external_customer_id.as_deref() == Some(customer_id))
            .cloned()
            .collect();

        // HashMap iteration order is arbitrary
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError> {
        Ok(self.organizations.read().await.get(id).cloned())
    }

    async fn update_subscription(
        &self,
        id: &OrganizationId,
        subscription: &SubscriptionRecord,
    ) -> Result<(), DomainError> {
        let mut organizations = self.organizations.write().await;
        let org = organizations.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::OrganizationNotFound, "Organization not found")
                .with_detail("organization_id", id.as_str())
        })?;
        org.subscription = subscription.clone();
        Ok(())
    }

    async fn apply_change(
        &self,
        id: &OrganizationId,
        change: &SubscriptionChange,
    ) -> Result<Option<AppliedChange>, DomainError> {
        let mut organizations = self.organizations.write().await;
        let Some(org) = organizations.get_mut(id) else {
            return Ok(None);
        };
        let changed = org.subscription.apply(change);
        Ok(Some(AppliedChange {
            subscription: org.subscription.clone(),
            changed,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{BillingInterval, SubscriptionTier};

    fn org(id: &str, customer_id: Option<&str>) -> Organization {
        let mut org = Organization::new(OrganizationId::new(id).unwrap(), format!("Org {}", id));
        org.subscription.external_customer_id = customer_id.map(str::to_string);
        org
    }

    #[tokio::test]
    async fn find_by_customer_id_returns_matches_ordered_by_id() {
        let store = InMemoryOrganizationStore::new();
        store
            .seed([
                org("org_c", Some("cus_1")),
                org("org_a", Some("cus_1")),
                org("org_b", Some("cus_2")),
            ])
            .await;

        let found = store.find_by_customer_id("cus_1", 10).await.unwrap();

        let ids: Vec<&str> = found.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["org_a", "org_c"]);
    }

    #[tokio::test]
    async fn find_by_customer_id_respects_limit() {
        let store = InMemoryOrganizationStore::new();
        store
            .seed([
                org("org_1", Some("cus_1")),
                org("org_2", Some("cus_1")),
                org("org_3", Some("cus_1")),
            ])
            .await;

        let found = store.find_by_customer_id("cus_1", 2).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id.as_str(), "org_1");
    }

    #[tokio::test]
    async fn find_by_customer_id_with_no_match_is_empty() {
        let store = InMemoryOrganizationStore::new();
        store.seed([org("org_1", None)]).await;

        assert!(store.find_by_customer_id("cus_1", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_missing() {
        let store = InMemoryOrganizationStore::default();
        let id = OrganizationId::new("org_missing").unwrap();

        assert!(store.find_by_id(&id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn update_subscription_replaces_whole_record() {
        let store = InMemoryOrganizationStore::new();
        store.seed([org("org_1", Some("cus_1"))]).await;
        let id = OrganizationId::new("org_1").unwrap();
        let record = SubscriptionRecord {
            tier: SubscriptionTier::Business,
            status: Some("active".to_string()),
            ..SubscriptionRecord::default()
        };

        store.update_subscription(&id, &record).await.unwrap();

        let stored = store.get(&id).await.unwrap();
        assert_eq!(stored.subscription, record);
        assert_eq!(stored.name, "Org org_1");
    }

    #[tokio::test]
    async fn update_subscription_for_missing_org_fails() {
        let store = InMemoryOrganizationStore::new();
        let id = OrganizationId::new("org_missing").unwrap();

        let err = store
            .update_subscription(&id, &SubscriptionRecord::default())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::OrganizationNotFound);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn apply_change_transitions_latest_record() {
        let store = InMemoryOrganizationStore::new();
        let mut seeded = org("org_1", Some("cus_1"));
        seeded.subscription.tier = SubscriptionTier::Business;
        seeded.subscription.billing_interval = Some(BillingInterval::Yearly);
        seeded.subscription.external_subscription_id = Some("sub_1".to_string());
        store.seed([seeded]).await;
        let id = OrganizationId::new("org_1").unwrap();

        let applied = store
            .apply_change(&id, &SubscriptionChange::Downgrade { status: "expired".to_string() })
            .await
            .unwrap()
            .unwrap();

        assert!(applied.changed);
        assert_eq!(applied.subscription.tier, SubscriptionTier::Free);
        assert_eq!(applied.subscription.billing_interval, Some(BillingInterval::Yearly));
        assert_eq!(applied.subscription.external_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(store.get(&id).await.unwrap().subscription, applied.subscription);
    }

    #[tokio::test]
    async fn apply_change_reports_unchanged_on_replay() {
        let store = InMemoryOrganizationStore::new();
        store.seed([org("org_1", None)]).await;
        let id = OrganizationId::new("org_1").unwrap();
        let change = SubscriptionChange::LinkCustomer {
            external_customer_id: "cus_9".to_string(),
        };

        let first = store.apply_change(&id, &change).await.unwrap().unwrap();
        let second = store.apply_change(&id, &change).await.unwrap().unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.subscription, second.subscription);
    }

    #[tokio::test]
    async fn apply_change_for_missing_org_is_none() {
        let store = InMemoryOrganizationStore::new();
        let id = OrganizationId::new("org_missing").unwrap();

        let applied = store
            .apply_change(&id, &SubscriptionChange::Downgrade { status: "canceled".to_string() })
            .await
            .unwrap();

        assert!(applied.is_none());
    }
}
