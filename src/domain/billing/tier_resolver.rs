//! Price id to subscription tier resolution.

use std::collections::HashMap;

use super::tier::SubscriptionTier;
use super::webhook_errors::WebhookError;

/// Tier granted for a price id that has no mapping.
pub const FALLBACK_TIER: SubscriptionTier = SubscriptionTier::Starter;

/// Static price catalog, built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceTierMap {
    prices: HashMap<String, SubscriptionTier>,
    strict: bool,
}

impl PriceTierMap {
    pub fn new(prices: HashMap<String, SubscriptionTier>) -> Self {
        Self {
            prices,
            strict: false,
        }
    }

    /// Fail on unmapped prices instead of falling back to `FALLBACK_TIER`.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn insert(&mut self, price_id: impl Into<String>, tier: SubscriptionTier) {
        self.prices.insert(price_id.into(), tier);
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Resolves a price id to its tier.
    ///
    /// Unmapped prices resolve to `FALLBACK_TIER` with a warning, or to
    /// `UnknownPrice` in strict mode.
    pub fn resolve(&self, price_id: &str) -> Result<SubscriptionTier, WebhookError> {
        if let Some(tier) = self.prices.get(price_id) {
            return Ok(*tier);
        }

        if self.strict {
            return Err(WebhookError::UnknownPrice(price_id.to_string()));
        }

        tracing::warn!(
            price_id = %price_id,
            fallback_tier = %FALLBACK_TIER,
            "Price id has no tier mapping, falling back"
        );
        Ok(FALLBACK_TIER)
    }
}

impl FromIterator<(String, SubscriptionTier)> for PriceTierMap {
    fn from_iter<I: IntoIterator<Item = (String, SubscriptionTier)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
