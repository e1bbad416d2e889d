//! Token service: issue, verify and reissue short-lived HS256 tokens.
//!
//! Verification collapses every failure to `None`. The cause is only logged.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mediagate_core::AppError;
use serde::{Deserialize, Serialize};

use super::models::{IssuedToken, VerifiedClaim};

/// Signed payload carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identity
    pub sub: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
    /// Issued at, seconds since the Unix epoch
    pub iat: i64,
}

/// Process-wide symmetric signing key.
#[derive(Clone)]
pub struct ServerKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl ServerKey {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl fmt::Debug for ServerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerKey(<redacted>)")
    }
}

/// Source of the current instant; swapped out in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Why a token was refused. Logged, never returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerifyFailure {
    Malformed,
    BadSignature,
    Expired,
}

#[derive(Clone)]
pub struct TokenService {
    key: ServerKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(key: ServerKey, ttl: Duration) -> Self {
        Self::with_clock(key, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(key: ServerKey, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { key, ttl, clock }
    }

    /// Issue a token for `identity` expiring one validity window from now.
    pub fn issue(&self, identity: &str) -> Result<IssuedToken, AppError> {
        let now = self.clock.now();
        self.sign(identity, now, now + self.ttl)
    }

    /// Decode and check signature and expiry.
    pub fn verify(&self, token: &str) -> Option<VerifiedClaim> {
        match self.check(token) {
            Ok(claim) => Some(claim),
            Err(cause) => {
                tracing::debug!(cause = ?cause, "Token verification failed");
                None
            }
        }
    }

    /// Sliding session: a new token for the same identity whose expiry is
    /// strictly later than the presented one.
    pub fn reissue(&self, claim: &VerifiedClaim) -> Result<IssuedToken, AppError> {
        let now = self.clock.now();
        let extended = now + self.ttl;
        let floor = claim.expires_at + Duration::seconds(1);
        self.sign(&claim.identity, now, extended.max(floor))
    }

    /// Verify `token` and reissue it; refused tokens are `Unauthorized`.
    pub fn reissue_token(&self, token: &str) -> Result<IssuedToken, AppError> {
        let claim = self
            .verify(token)
            .ok_or_else(|| AppError::Unauthorized("token rejected for reissue".to_string()))?;
        self.reissue(&claim)
    }

    fn sign(
        &self,
        identity: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let claims = Claims {
            sub: identity.to_string(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            identity: claims.sub,
            expires_at: timestamp(claims.exp),
        })
    }

    fn check(&self, token: &str) -> Result<VerifiedClaim, VerifyFailure> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the injected clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        let data = decode::<Claims>(token, &self.key.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => VerifyFailure::BadSignature,
                _ => VerifyFailure::Malformed,
            }
        })?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(VerifyFailure::Malformed);
        }
        if self.clock.now() > timestamp(claims.exp) {
            return Err(VerifyFailure::Expired);
        }

        Ok(VerifiedClaim {
            identity: claims.sub,
            expires_at: timestamp(claims.exp),
        })
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
