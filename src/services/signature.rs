// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook signature verification.
//!
//! Providers sign each delivery with a shared secret and send the result in a
//! header of the form `t=<unix-seconds>,v1=<hex hmac-sha256>`. The MAC covers
//! the timestamp and the raw body bytes. Terra's documentation says the two
//! are joined with a `.`, but deliveries have been observed without the
//! separator, so both forms are accepted.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded SHA-256 digest.
const HEX_DIGEST_LEN: usize = 64;

/// Timestamps above this are taken to be in milliseconds.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// Parsed `t=...,v1=...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader<'a> {
    pub timestamp: &'a str,
    pub signature: &'a str,
}

impl<'a> SignatureHeader<'a> {
    /// Parse a signature header. Returns `None` if `t` or `v1` is missing or empty.
    pub fn parse(header: &'a str) -> Option<Self> {
        let mut timestamp = None;
        let mut signature = None;

        for pair in header.split(',') {
            let Some((key, value)) = pair.trim().split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "t" if timestamp.is_none() => timestamp = Some(value),
                "v1" if signature.is_none() => signature = Some(value),
                _ => {}
            }
        }

        Some(Self {
            timestamp: timestamp.filter(|t| !t.is_empty())?,
            signature: signature.filter(|s| !s.is_empty())?,
        })
    }

    /// Timestamp as Unix seconds, if numeric.
    pub fn unix_seconds(&self) -> Option<i64> {
        let raw: i64 = self.timestamp.parse().ok()?;
        if raw > MILLIS_THRESHOLD {
            Some(raw / 1000)
        } else {
            Some(raw)
        }
    }
}

/// Verify a webhook signature against the raw request body.
///
/// Returns `false` for a malformed header, an empty secret or a digest
/// mismatch. Never panics.
pub fn verify(raw_body: &[u8], signature_header: &str, shared_secret: &str) -> bool {
    verify_labeled(raw_body, signature_header, shared_secret, "webhook")
}

/// Produce a `t=...,v1=...` header for `raw_body` (dot-separated format).
pub fn sign(raw_body: &[u8], timestamp: i64, shared_secret: &str) -> anyhow::Result<String> {
    let timestamp = timestamp.to_string();
    let digest = hex_digest(shared_secret, &timestamp, Some(b"."), raw_body)
        .ok_or_else(|| anyhow::anyhow!("HMAC init failed"))?;
    Ok(format!("t={},v1={}", timestamp, digest))
}

fn verify_labeled(raw_body: &[u8], signature_header: &str, secret: &str, provider: &str) -> bool {
    if secret.is_empty() {
        tracing::error!(provider, "Webhook secret is empty, rejecting delivery");
        return false;
    }

    let Some(header) = SignatureHeader::parse(signature_header) else {
        tracing::warn!(provider, "Malformed or missing signature header");
        return false;
    };

    let received = header.signature.to_ascii_lowercase();

    let dotted = hex_digest(secret, header.timestamp, Some(b"."), raw_body);
    let joined = hex_digest(secret, header.timestamp, None, raw_body);

    let matched = [dotted, joined]
        .iter()
        .flatten()
        .fold(false, |acc, expected| {
            acc | constant_time_hex_equals(&received, expected)
        });

    if !matched {
        tracing::warn!(
            provider,
            timestamp = header.timestamp,
            received_len = received.len(),
            expected_len = HEX_DIGEST_LEN,
            "Webhook signature mismatch"
        );
    }

    matched
}

fn hex_digest(secret: &str, timestamp: &str, separator: Option<&[u8]>, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    if let Some(sep) = separator {
        mac.update(sep);
    }
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_hex_equals(left: &str, right: &str) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.as_bytes().ct_eq(right.as_bytes()).into()
}

/// Verifier bound to one provider's secret, with an optional freshness window.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    provider: &'static str,
    max_skew: Option<Duration>,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .field("provider", &self.provider)
            .field("max_skew", &self.max_skew)
            .finish()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>, provider: &'static str) -> Self {
        Self {
            secret: secret.into(),
            provider,
            max_skew: None,
        }
    }

    /// Reject signatures whose timestamp is farther than `max_skew` from now.
    pub fn with_max_skew(mut self, max_skew: Option<Duration>) -> Self {
        self.max_skew = max_skew;
        self
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Verify against the current wall clock.
    pub fn verify(&self, raw_body: &[u8], signature_header: &str) -> bool {
        self.verify_at(raw_body, signature_header, chrono::Utc::now().timestamp())
    }

    /// Verify with an explicit `now` (Unix seconds).
    pub fn verify_at(&self, raw_body: &[u8], signature_header: &str, now: i64) -> bool {
        if !verify_labeled(raw_body, signature_header, &self.secret, self.provider) {
            return false;
        }

        let Some(max_skew) = self.max_skew else {
            return true;
        };

        let sent_at = SignatureHeader::parse(signature_header).and_then(|h| h.unix_seconds());
        match sent_at {
            Some(ts) if now.abs_diff(ts) <= max_skew.as_secs() => true,
            Some(ts) => {
                tracing::warn!(
                    provider = self.provider,
                    skew_secs = now.abs_diff(ts),
                    max_skew_secs = max_skew.as_secs(),
                    "Webhook signature timestamp outside allowed window"
                );
                false
            }
            None => {
                tracing::warn!(
                    provider = self.provider,
                    "Webhook signature timestamp is not numeric"
                );
                false
            }
        }
    }
}
