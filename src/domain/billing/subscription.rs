//! Organization subscription record.
//!
//! The subscription record is a sub-document of an organization. It is only
//! ever transitioned, never deleted, and always written as a whole.
//!
//! # Design Decisions
//!
//! - **Provider owns the state machine**: `status` is stored verbatim
//! - **Full overwrite**: every change sets all the fields it owns, so
//!   replaying a change converges to the same record
//! - **Soft downgrade**: cancellation resets the tier but keeps provider ids

use serde::{Deserialize, Serialize};

use super::tier::{BillingInterval, SubscriptionTier};
use crate::domain::foundation::{OrganizationId, Timestamp};

/// Billing state of one organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    /// Plan level granting feature access.
    #[serde(rename = "subscriptionTier")]
    pub tier: SubscriptionTier,

    /// Provider status string (e.g., "active", "trialing", "canceled").
    #[serde(rename = "subscriptionStatus")]
    pub status: Option<String>,

    pub billing_interval: Option<BillingInterval>,

    /// Provider customer id linked to this organization.
    #[serde(rename = "flowgladCustomerId")]
    pub external_customer_id: Option<String>,

    /// Provider subscription id of the current subscription.
    #[serde(rename = "flowgladSubscriptionId")]
    pub external_subscription_id: Option<String>,

    pub trial_end: Option<Timestamp>,
}

/// An organization as seen by the billing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    #[serde(flatten)]
    pub subscription: SubscriptionRecord,
}

impl Organization {
    /// Creates an organization on the free tier with no provider link.
    pub fn new(id: OrganizationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            subscription: SubscriptionRecord::default(),
        }
    }

    pub fn with_subscription(mut self, subscription: SubscriptionRecord) -> Self {
        self.subscription = subscription;
        self
    }
}

/// A state transition derived from a billing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionChange {
    /// Subscription created, updated or activated.
    Activate {
        tier: SubscriptionTier,
        status: String,
        billing_interval: BillingInterval,
        external_customer_id: String,
        external_subscription_id: Option<String>,
        trial_end: Option<Timestamp>,
    },

    /// Subscription canceled or expired.
    Downgrade { status: String },

    /// Customer created on the provider side for this organization.
    LinkCustomer { external_customer_id: String },
}

impl SubscriptionChange {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SubscriptionChange::Activate { .. } => "activate",
            SubscriptionChange::Downgrade { .. } => "downgrade",
            SubscriptionChange::LinkCustomer { .. } => "link_customer",
        }
    }
}

impl SubscriptionRecord {
    /// Applies a change in place.
    ///
    /// Returns true if any field changed.
    pub fn apply(&mut self, change: &SubscriptionChange) -> bool {
        let before = self.clone();

        match change {
            SubscriptionChange::Activate {
                tier,
                status,
                billing_interval,
                external_customer_id,
                external_subscription_id,
                trial_end,
            } => {
                self.tier = *tier;
                self.status = Some(status.clone());
                self.billing_interval = Some(*billing_interval);
                self.external_customer_id = Some(external_customer_id.clone());
                if let Some(subscription_id) = external_subscription_id {
                    self.external_subscription_id = Some(subscription_id.clone());
                }
                self.trial_end = *trial_end;
            }
            SubscriptionChange::Downgrade { status } => {
                self.tier = SubscriptionTier::Free;
                self.status = Some(status.clone());
            }
            SubscriptionChange::LinkCustomer {
                external_customer_id,
            } => {
                self.external_customer_id = Some(external_customer_id.clone());
            }
        }

        *self != before
    }
}
