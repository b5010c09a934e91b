//! Organization store port.
//!
//! Defines the contract for reading organizations and writing their
//! subscription sub-document. Implementations are assumed durable and
//! read-your-writes consistent per organization; no cross-key transactions
//! are required.
//!
//! `apply_change` is the write path for webhook reconciliation. The record is
//! read, transitioned and written back as one unit in the store, so replicas
//! sharing a database cannot interleave a stale read with a newer write.
//!
//! # Example
//!
//! ```ignore
//! async fn downgrade(
//!     store: &dyn OrganizationStore,
//!     id: &OrganizationId,
//! ) -> Result<bool, DomainError> {
//!     let change = SubscriptionChange::Downgrade {
//!         status: "canceled".to_string(),
//!     };
//!     let applied = store.apply_change(id, &change).await?;
//!     Ok(applied.is_some_and(|applied| applied.changed))
//! }
//! ```

use crate::domain::billing::{Organization, SubscriptionChange, SubscriptionRecord};
use crate::domain::foundation::{DomainError, OrganizationId};
use async_trait::async_trait;

/// Result of applying a change to a stored subscription record.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedChange {
    /// The record as stored after the change.
    pub subscription: SubscriptionRecord,
    /// False when the change matched the stored record and nothing was written.
    pub changed: bool,
}

/// Store port for organizations and their subscription records.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Find organizations linked to a provider customer id.
    ///
    /// Results are ordered by organization id and capped at `limit`.
    /// More than one result is a data-integrity anomaly the caller reports.
    async fn find_by_customer_id(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<Organization>, DomainError>;

    /// Find an organization by its primary key.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError>;

    /// Replace the subscription record of an organization in one write.
    ///
    /// # Errors
    ///
    /// - `OrganizationNotFound` if the organization doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_subscription(
        &self,
        id: &OrganizationId,
        subscription: &SubscriptionRecord,
    ) -> Result<(), DomainError>;

    /// Apply a change to the latest stored record and persist it atomically.
    ///
    /// The read and the write happen under the store's own row guard.
    /// Returns `None` if the organization doesn't exist.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn apply_change(
        &self,
        id: &OrganizationId,
        change: &SubscriptionChange,
    ) -> Result<Option<AppliedChange>, DomainError>;
}
