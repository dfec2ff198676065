//! Signed, time-limited identity tokens (HS256 JWT).
//!
//! Tokens are stateless: nothing is persisted server-side, so a token stays
//! valid until it expires. Changing the secret invalidates every outstanding
//! token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller, attached to the request by the auth middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token signature does not match")]
    Invalid,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed")]
    Malformed,

    #[error("failed to sign token: {0}")]
    Issue(jsonwebtoken::errors::Error),

    #[error("token lifetime of {0}s is out of range")]
    InvalidTtl(u64),
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Fails when `ttl_secs` cannot be added to the current time.
    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self, TokenError> {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or(TokenError::InvalidTtl(ttl_secs))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String, TokenError> {
        self.issue_at(user_id, role, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::InvalidTtl(self.ttl.num_seconds().unsigned_abs()))?;
        let claims = Claims {
            sub: user_id,
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        debug!("Issuing token for user {} ({})", user_id, role);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Issue)
    }

    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::Invalid,
                _ => TokenError::Malformed,
            }
        })?;
        Ok(Identity {
            user_id: data.claims.sub,
            role: data.claims.role,
        })
    }
}
