//! Subscription tier and billing interval definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Internal subscription plan level.
///
/// Ordered from least to most capable; `rank()` reflects that ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// No paid subscription. Every organization starts here and returns
    /// here on cancellation or expiry.
    #[default]
    Free,

    /// Lowest paid tier. Also the fallback for unmapped price ids.
    Starter,

    Professional,

    Business,
}

impl SubscriptionTier {
    /// Returns true if this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }

    /// Returns the wire/storage name for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Starter => "starter",
            SubscriptionTier::Professional => "professional",
            SubscriptionTier::Business => "business",
        }
    }

    /// Returns the numeric rank of this tier for comparison.
    pub fn rank(&self) -> u8 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Starter => 1,
            SubscriptionTier::Professional => 2,
            SubscriptionTier::Business => 3,
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "starter" => Ok(SubscriptionTier::Starter),
            "professional" => Ok(SubscriptionTier::Professional),
            "business" => Ok(SubscriptionTier::Business),
            other => Err(ValidationError::invalid_format(
                "tier",
                format!("unknown tier '{}'", other),
            )),
        }
    }
}

/// Billing cadence of a paid subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    /// Derives the interval from the provider's interval discriminator.
    ///
    /// Only the exact value `"year"` means yearly billing; any other value,
    /// including an absent one, is treated as monthly.
    pub fn from_discriminator(discriminator: Option<&str>) -> Self {
        match discriminator {
            Some("year") => BillingInterval::Yearly,
            _ => BillingInterval::Monthly,
        }
    }

    /// Returns the wire/storage name for this interval.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BillingInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingInterval::Monthly),
            "yearly" => Ok(BillingInterval::Yearly),
            other => Err(ValidationError::invalid_format(
                "billing_interval",
                format!("unknown interval '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_is_not_paid() {
        assert!(!SubscriptionTier::Free.is_paid());
        assert!(SubscriptionTier::Starter.is_paid());
        assert!(SubscriptionTier::Business.is_paid());
    }

    #[test]
    fn default_tier_is_free() {
        assert_eq!(SubscriptionTier::default(), SubscriptionTier::Free);
    }

    #[test]
    fn ranks_follow_declaration_order() {
        assert!(SubscriptionTier::Free.rank() < SubscriptionTier::Starter.rank());
        assert!(SubscriptionTier::Starter.rank() < SubscriptionTier::Professional.rank());
        assert!(SubscriptionTier::Professional.rank() < SubscriptionTier::Business.rank());
    }

    #[test]
    fn tier_serializes_lowercase() {
        let json = serde_json::to_string(&SubscriptionTier::Professional).unwrap();
        assert_eq!(json, "\"professional\"");
    }

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!(
            " Business ".parse::<SubscriptionTier>().unwrap(),
            SubscriptionTier::Business
        );
        assert!("enterprise".parse::<SubscriptionTier>().is_err());
    }

    #[test]
    fn only_exact_year_is_yearly() {
        assert_eq!(
            BillingInterval::from_discriminator(Some("year")),
            BillingInterval::Yearly
        );
        assert_eq!(
            BillingInterval::from_discriminator(Some("month")),
            BillingInterval::Monthly
        );
        assert_eq!(
            BillingInterval::from_discriminator(Some("Year")),
            BillingInterval::Monthly
        );
        assert_eq!(
            BillingInterval::from_discriminator(Some("yearly")),
            BillingInterval::Monthly
        );
        assert_eq!(BillingInterval::from_discriminator(None), BillingInterval::Monthly);
    }

    #[test]
    fn interval_round_trips_through_storage_name() {
        for interval in [BillingInterval::Monthly, BillingInterval::Yearly] {
            assert_eq!(interval.as_str().parse::<BillingInterval>().unwrap(), interval);
        }
    }
}
