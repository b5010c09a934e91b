//! Billing webhook signature verification.
//!
//! Verifies HMAC-SHA256 signatures over `"{timestamp}.{raw body}"` and rejects
//! signatures outside the replay window. A header may carry several
//! space-separated `version,timestamp,signature` entries (key rotation); the
//! request is authentic when any one entry passes every check.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::webhook_errors::WebhookError;
use crate::domain::foundation::Timestamp;

type HmacSha256 = Hmac<Sha256>;

/// The only signature scheme version this verifier accepts.
pub const SIGNATURE_VERSION: &str = "v1";

/// Default replay window in seconds, applied in both directions.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// One `version,timestamp,signature` entry from the signature header.
///
/// Fields are kept as received; each check in `WebhookVerifier::check_entry`
/// interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pub version: String,
    pub timestamp: String,
    pub signature: String,
}

/// Parsed signature header: every well-formed entry in received order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub entries: Vec<SignatureEntry>,
}

impl SignatureHeader {
    /// Parses a signature header value.
    ///
    /// Format: `v1,<unix-ts>,<base64> [v1,<unix-ts>,<base64> ...]`
    ///
    /// Tokens without exactly three comma-separated parts are dropped.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::MalformedHeader` when the value contains
    /// anything but visible ASCII and whitespace, or no token is well-formed.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        if !header
            .chars()
            .all(|c| c.is_ascii_graphic() || c.is_ascii_whitespace())
        {
            return Err(WebhookError::MalformedHeader(
                "header is not visible ASCII".to_string(),
            ));
        }

        let mut entries = Vec::new();

        for (index, token) in header.split_whitespace().enumerate() {
            let parts: Vec<&str> = token.split(',').collect();
            match parts.as_slice() {
                [version, timestamp, signature] => entries.push(SignatureEntry {
                    version: (*version).to_string(),
                    timestamp: (*timestamp).to_string(),
                    signature: (*signature).to_string(),
                }),
                _ => {
                    tracing::debug!(
                        entry = index,
                        parts = parts.len(),
                        "Dropping malformed signature entry"
                    );
                }
            }
        }

        if entries.is_empty() {
            return Err(WebhookError::MalformedHeader(
                "no version,timestamp,signature entries".to_string(),
            ));
        }

        Ok(SignatureHeader { entries })
    }
}

/// Why a single signature entry was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRejection {
    UnsupportedVersion(String),
    InvalidTimestamp,
    OutsideTolerance { skew_secs: u64 },
    SignatureMismatch,
}

impl std::fmt::Display for EntryRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryRejection::UnsupportedVersion(v) => write!(f, "unsupported version '{}'", v),
            EntryRejection::InvalidTimestamp => write!(f, "invalid timestamp"),
            EntryRejection::OutsideTolerance { skew_secs } => {
                write!(f, "timestamp outside tolerance by {}s skew", skew_secs)
            }
            EntryRejection::SignatureMismatch => write!(f, "signature mismatch"),
        }
    }
}

/// Details of the entry that authenticated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedSignature {
    /// Signing time claimed by the accepted entry (Unix seconds).
    pub timestamp: i64,
    /// Position of the accepted entry in the header.
    pub entry_index: usize,
}

/// Verifier for billing webhook signatures.
pub struct WebhookVerifier {
    /// Shared signing secret from the provider dashboard.
    secret: SecretString,
    /// Replay window in seconds.
    tolerance_secs: i64,
}

impl WebhookVerifier {
    /// Creates a verifier with the default 300 second replay window.
    pub fn new(secret: SecretString) -> Self {
        Self::with_tolerance(secret, DEFAULT_TOLERANCE_SECS)
    }

    /// Creates a verifier with a custom replay window.
    pub fn with_tolerance(secret: SecretString, tolerance_secs: i64) -> Self {
        Self {
            secret,
            tolerance_secs: tolerance_secs.max(0),
        }
    }

    /// Returns `MissingSecret` when no signing secret is configured.
    pub fn ensure_configured(&self) -> Result<(), WebhookError> {
        if self.secret.expose_secret().is_empty() {
            return Err(WebhookError::MissingSecret);
        }
        Ok(())
    }

    /// Verifies `payload` against the signature header value at time `now`.
    ///
    /// `payload` must be the exact bytes received on the wire.
    ///
    /// # Errors
    ///
    /// - `MissingSecret` - no signing secret is configured
    /// - `MalformedHeader` - header has no parseable entry
    /// - `NoValidSignature` - every entry failed a check
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: Timestamp,
    ) -> Result<VerifiedSignature, WebhookError> {
        self.ensure_configured()?;

        let header = SignatureHeader::parse(signature_header)?;
        let now_secs = now.as_unix_secs();
        let mut rejections = Vec::with_capacity(header.entries.len());

        for (index, entry) in header.entries.iter().enumerate() {
            match self.check_entry(entry, payload, now_secs) {
                Ok(timestamp) => {
                    if !rejections.is_empty() {
                        tracing::debug!(
                            accepted_entry = index,
                            rejected_entries = rejections.len(),
                            "Signature accepted after skipping entries"
                        );
                    }
                    return Ok(VerifiedSignature {
                        timestamp,
                        entry_index: index,
                    });
                }
                Err(rejection) => {
                    tracing::debug!(entry = index, reason = %rejection, "Signature entry rejected");
                    rejections.push(format!("#{}: {}", index, rejection));
                }
            }
        }

        tracing::warn!(
            entries = header.entries.len(),
            rejections = ?rejections,
            "No signature entry passed verification"
        );
        Err(WebhookError::NoValidSignature)
    }

    /// Runs version, timestamp, freshness and HMAC checks on one entry.
    fn check_entry(
        &self,
        entry: &SignatureEntry,
        payload: &[u8],
        now_secs: i64,
    ) -> Result<i64, EntryRejection> {
        if entry.version != SIGNATURE_VERSION {
            return Err(EntryRejection::UnsupportedVersion(entry.version.clone()));
        }

        let timestamp: i64 = entry
            .timestamp
            .parse()
            .map_err(|_| EntryRejection::InvalidTimestamp)?;
        if timestamp <= 0 {
            return Err(EntryRejection::InvalidTimestamp);
        }

        let skew_secs = now_secs
            .checked_sub(timestamp)
            .map(i64::unsigned_abs)
            .ok_or(EntryRejection::InvalidTimestamp)?;
        if skew_secs > self.tolerance_secs.unsigned_abs() {
            return Err(EntryRejection::OutsideTolerance { skew_secs });
        }

        let secret = self.secret.expose_secret().as_bytes();
        let expected = compute_signature(secret, timestamp, payload);
        if !constant_time_compare(expected.as_bytes(), entry.signature.as_bytes()) {
            return Err(EntryRejection::SignatureMismatch);
        }

        Ok(timestamp)
    }
}

/// Computes the base64-encoded HMAC-SHA256 of `"{timestamp}.{payload}"`.
///
/// The payload bytes are fed to the MAC unchanged; no UTF-8 round trip.
pub fn compute_signature(secret: &[u8], timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Builds a single `v1,<timestamp>,<signature>` header entry.
pub fn signature_entry(secret: &[u8], timestamp: i64, payload: &[u8]) -> String {
    format!(
        "{},{},{}",
        SIGNATURE_VERSION,
        timestamp,
        compute_signature(secret, timestamp, payload)
    )
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
