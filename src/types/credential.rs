//! Credential Types
//!
//! The stored credential value and the pushed verify ticket.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Safety margin subtracted from a server-reported TTL, in seconds.
pub const EXPIRY_SKEW_SECS: i64 = 10;

/// Current wall clock in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Compute the absolute expiry for a server-reported TTL.
///
/// The margin keeps a token that is about to lapse in flight from being
/// presented upstream as if it were fresh. Out-of-range TTLs saturate
/// rather than overflow, so an absurd upstream value cannot panic here.
pub fn expiry_from_ttl(now_ms: i64, ttl_secs: i64) -> i64 {
    now_ms.saturating_add(ttl_secs.saturating_sub(EXPIRY_SKEW_SECS).saturating_mul(1000))
}

/// A stored credential for one identity.
///
/// A refresh replaces the whole value; there is no partial update. Validity
/// is a pure function of the value and a clock reading, so callers can check
/// it without I/O.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    /// Opaque bearer token presented upstream.
    pub access_token: String,
    /// Absolute expiry in epoch milliseconds.
    pub expire_at: i64,
    /// Long-lived refresh token, for credential kinds that carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Credential {
    /// Create a credential from a freshly minted token and its TTL.
    pub fn new(access_token: impl Into<String>, ttl_secs: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expire_at: expiry_from_ttl(now_ms(), ttl_secs),
            refresh_token: None,
        }
    }

    /// Attach a refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Seed a credential that holds only a refresh token.
    ///
    /// Never valid, so the first use forces a mint.
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: String::new(),
            expire_at: 0,
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Check validity against the current clock.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_ms())
    }

    /// Check validity against an explicit clock reading.
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        !self.access_token.is_empty() && now_ms < self.expire_at
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("expire_at", &self.expire_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Verify ticket pushed by the platform.
///
/// Opaque here: consumed at mint time, never cached or validated by the
/// credential layer itself.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyTicket(String);

impl VerifyTicket {
    /// Wrap a pushed ticket value.
    pub fn new(ticket: impl Into<String>) -> Self {
        Self(ticket.into())
    }

    /// Borrow the raw ticket value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for VerifyTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("VerifyTicket").field(&"[REDACTED]").finish()
    }
}
