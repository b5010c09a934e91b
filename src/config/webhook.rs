//! Webhook configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;

use super::error::ValidationError;
use super::server::Environment;
use crate::domain::billing::{PriceTierMap, SubscriptionTier, WebhookVerifier};

/// Webhook configuration (signing and price catalog)
#[derive(Debug, Deserialize)]
pub struct WebhookConfig {
    /// Shared signing secret from the billing provider
    #[serde(default = "default_signing_secret")]
    pub signing_secret: SecretString,

    /// Replay window in seconds
    #[serde(default = "default_tolerance")]
    pub tolerance_secs: i64,

    /// Price catalog as `price_id=tier` pairs, comma-separated
    #[serde(default)]
    pub price_tiers: String,

    /// Reject unmapped price ids instead of falling back to starter
    #[serde(default)]
    pub strict_price_mapping: bool,
}

impl WebhookConfig {
    /// Check if a signing secret is configured
    pub fn has_signing_secret(&self) -> bool {
        !self.signing_secret.expose_secret().is_empty()
    }

    /// Build the signature verifier
    pub fn verifier(&self) -> WebhookVerifier {
        WebhookVerifier::with_tolerance(
            SecretString::new(self.signing_secret.expose_secret().clone()),
            self.tolerance_secs,
        )
    }

    /// Parse `price_tiers` into the price catalog
    ///
    /// Format: `price_starter=starter,price_pro_monthly=professional`
    pub fn price_tier_map(&self) -> Result<PriceTierMap, ValidationError> {
        let mut prices = HashMap::new();

        for pair in self.price_tiers.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (price_id, tier) = pair.split_once('=').ok_or_else(|| {
                ValidationError::InvalidPriceTiers(format!("'{}' is not price_id=tier", pair))
            })?;
            let price_id = price_id.trim();
            if price_id.is_empty() {
                return Err(ValidationError::InvalidPriceTiers(format!(
                    "'{}' has an empty price id",
                    pair
                )));
            }
            let tier: SubscriptionTier = tier
                .parse()
                .map_err(|e| ValidationError::InvalidPriceTiers(format!("{}", e)))?;
            if prices.insert(price_id.to_string(), tier).is_some() {
                return Err(ValidationError::InvalidPriceTiers(format!(
                    "price id '{}' is mapped twice",
                    price_id
                )));
            }
        }

        Ok(PriceTierMap::new(prices).strict(self.strict_price_mapping))
    }

    /// Validate webhook configuration
    ///
    /// A missing secret is allowed outside production; every webhook then
    /// fails with a server error until one is configured.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if *environment == Environment::Production && !self.has_signing_secret() {
            return Err(ValidationError::MissingRequired("WEBHOOK__SIGNING_SECRET"));
        }
        if self.tolerance_secs <= 0 {
            return Err(ValidationError::InvalidTolerance);
        }
        self.price_tier_map()?;
        Ok(())
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            signing_secret: default_signing_secret(),
            tolerance_secs: default_tolerance(),
            price_tiers: String::new(),
            strict_price_mapping: false,
        }
    }
}

fn default_signing_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_tolerance() -> i64 {
    300
}
