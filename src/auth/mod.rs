use std::collections::HashSet;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::User;
use crate::error::ApiError;

/// Token payload. Only `sub` is needed to authorize a request; everything
/// else is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    /// Claims for `user`, expiring `expiry_hours` from now. 0 omits `exp`.
    pub fn for_user(user: &User, expiry_hours: u64) -> Result<Self, JwtError> {
        let now = Utc::now();
        let exp = if expiry_hours == 0 {
            None
        } else {
            let expires_at = i64::try_from(expiry_hours)
                .ok()
                .and_then(Duration::try_hours)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .ok_or(JwtError::InvalidExpiry(expiry_hours))?;
            Some(expires_at.timestamp())
        };

        Ok(Self {
            sub: Some(user.id.to_string()),
            username: Some(user.username.clone()),
            iat: Some(now.timestamp()),
            exp,
        })
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Token lifetime of {0} hours is out of range")]
    InvalidExpiry(u64),
}

/// Signs and verifies HS256 tokens with the process-wide secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: u64,
}

impl TokenService {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, JwtError> {
        self.sign(&Claims::for_user(user, self.expiry_hours)?)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    /// Verify the signature and return the subject's user id
    pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        // `exp` is checked when present but not required
        let mut validation = Validation::default();
        validation.required_spec_claims = HashSet::new();

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => {
                    tracing::debug!("Rejected token: {}", e);
                    ApiError::TokenInvalid
                }
            }
        })?;

        data.claims
            .sub
            .as_deref()
            .and_then(|sub| Uuid::parse_str(sub).ok())
            .ok_or(ApiError::TokenInvalid)
    }
}
