//! Identity port: bearer tokens and password digests.
//!
//! The engine only ever sees an [`OwnerId`]. Tokens are HS256 JWTs carrying
//! the user id; passwords are stored as bcrypt hashes.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tally_core::OwnerId;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("failed to issue token: {0}")]
    Issue(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Resolves an opaque caller token to the owner it was issued for.
pub trait IdentityPort: Send + Sync {
    fn issue(&self, owner: OwnerId) -> Result<String, IdentityError>;
    fn resolve(&self, token: &str) -> Result<OwnerId, IdentityError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: i64,
    iat: i64,
    exp: i64,
}

pub struct JwtIdentity {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl JwtIdentity {
    pub fn new(secret: &str, ttl_hours: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: i64::from(ttl_hours) * 3600,
        }
    }
}

impl IdentityPort for JwtIdentity {
    fn issue(&self, owner: OwnerId) -> Result<String, IdentityError> {
        let now = Utc::now().timestamp();
        let claims = Claims { user_id: owner.0, iat: now, exp: now + self.ttl_secs };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IdentityError::Issue(e.to_string()))
    }

    fn resolve(&self, token: &str) -> Result<OwnerId, IdentityError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            let reason = match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => "token expired".to_string(),
                jsonwebtoken::errors::ErrorKind::InvalidSignature => "invalid signature".to_string(),
                other => format!("{:?}", other),
            };
            IdentityError::InvalidToken(reason)
        })?;
        Ok(OwnerId(data.claims.user_id))
    }
}

// ── Password digests ─────────────────────────────────────────────

/// Hash `password` with a fresh salt at the given bcrypt `cost`. CPU bound;
/// call from a blocking task.
pub fn hash_password(password: &str, cost: u32) -> Result<String, IdentityError> {
    bcrypt::hash(password, cost).map_err(|e| IdentityError::Hash(e.to_string()))
}

/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}
