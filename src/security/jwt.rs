//! Session token service.
//!
//! Tokens are HS256 JWTs carrying the user id and role. The session lifetime
//! is mutable at runtime: a settings update that changes the user session
//! timeout reconfigures this service after the merge has been persisted.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::{Role, User, UserId};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id.
    sub: UserId,
    role: Role,
    /// Issued-at, seconds. Compared against the user's credential stamp so a
    /// password change invalidates outstanding tokens.
    iat: i64,
    exp: i64,
}

/// Identity extracted from a validated token.
#[derive(Debug, Clone, Copy)]
pub struct TokenData {
    pub user_id: UserId,
    pub role: Role,
    pub issued_at: i64,
}

impl TokenData {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_lifetime: RwLock<Duration>,
}

impl JwtService {
    pub fn new(secret: &[u8], session_lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            session_lifetime: RwLock::new(session_lifetime),
        }
    }

    /// Mint a token for `user` valid for the current session lifetime.
    pub fn generate_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let lifetime = self.session_lifetime.read().as_secs() as i64;
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now,
            exp: now + lifetime,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate a token's signature and expiry and return its identity.
    pub fn parse_token(&self, token: &str) -> Result<TokenData, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(TokenData {
            user_id: data.claims.sub,
            role: data.claims.role,
            issued_at: data.claims.iat,
        })
    }

    /// Reconfigure the lifetime applied to newly minted tokens.
    pub fn set_user_session_duration(&self, lifetime: Duration) {
        *self.session_lifetime.write() = lifetime;
    }

    pub fn user_session_duration(&self) -> Duration {
        *self.session_lifetime.read()
    }
}
