//! Access and refresh token types.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// The only claim the client reads out of a refresh token.
#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: i64,
}

/// Short-lived credential authorizing API calls. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    encoded: String,
}

impl AccessToken {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self {
            encoded: encoded.into(),
        }
    }

    /// The encoded credential as received from the service.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

/// Longer-lived credential used to obtain new access tokens.
///
/// The expiry is read from the JWT `exp` claim without verifying the
/// signature — the client holds no server key, and the server stays the
/// authority on validity. A token whose expiry cannot be read is treated as
/// already expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    encoded: String,
    expires_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// Wrap an encoded token, reading the expiry from its `exp` claim.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        let encoded = encoded.into();
        let expires_at = read_expiry(&encoded);
        Self {
            encoded,
            expires_at,
        }
    }

    /// Wrap an encoded token with a known expiry (e.g. reloaded from storage).
    pub fn with_expiry(encoded: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            encoded: encoded.into(),
            expires_at,
        }
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token is past its expiry. Tokens with no readable expiry
    /// count as expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now(),
            None => true,
        }
    }
}

/// Read the `exp` claim without signature verification.
fn read_expiry(encoded: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    let data = decode::<ExpiryClaims>(encoded, &DecodingKey::from_secret(&[]), &validation).ok()?;
    Utc.timestamp_opt(data.claims.exp, 0).single()
}

/// The token pair held for an authenticated session.
///
/// Refresh is present once any successful auth has occurred; access may be
/// absent if not yet issued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    pub access: Option<AccessToken>,
    pub refresh: Option<RefreshToken>,
}

impl Tokens {
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}
