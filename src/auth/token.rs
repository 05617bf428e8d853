//! HS256 bearer tokens signed with the shared signing secret.

use super::AuthError;
use crate::{context, secrets::SecretProvider};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::SystemTime};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

/// Token lifetime in seconds.
pub const TOKEN_TTL_SECONDS: i64 = 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (credential record id).
    pub id: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Identity carried by a valid token.
#[derive(ToSchema, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Sign claims for `identity` issued at `issued_at` (unix seconds).
pub(crate) fn sign(identity: &Identity, issued_at: i64, secret: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        id: identity.id.clone(),
        email: identity.email.clone(),
        iat: issued_at,
        exp: issued_at + TOKEN_TTL_SECONDS,
    };

    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret))
}

/// Verify signature and expiry, with no leeway.
pub(crate) fn verify(token: &str, secret: &[u8]) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "iat"]);

    decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation).map(|data| data.claims)
}

/// Read-path check of bearer tokens.
///
/// Trust is purely cryptographic and time-bounded: the user directory is never
/// consulted.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    secrets: Arc<SecretProvider>,
}

impl TokenValidator {
    #[must_use]
    pub fn new(secrets: Arc<SecretProvider>) -> Self {
        Self { secrets }
    }

    /// Validate an `Authorization` header value (`Bearer <token>`).
    ///
    /// # Errors
    /// `AuthError::InvalidToken` when the header is missing or malformed, the
    /// signing secret cannot be obtained, the signature does not match or the
    /// token has expired.
    #[instrument(skip_all)]
    pub async fn validate(&self, authorization: Option<&str>) -> Result<Identity, AuthError> {
        let transaction = context::current_or_none();

        let Some(token) = authorization.and_then(bearer_token) else {
            debug!("[{}] - Missing or malformed bearer token.", transaction);
            return Err(AuthError::InvalidToken);
        };

        let secret = self.secrets.get().await.map_err(|e| {
            error!("[{}] - Signing secret unavailable: {}", transaction, e);
            AuthError::InvalidToken
        })?;

        let claims = verify(token, secret.expose_secret().as_bytes()).map_err(|e| {
            debug!("[{}] - Token rejected: {}", transaction, e);
            AuthError::InvalidToken
        })?;

        Ok(Identity {
            id: claims.id,
            email: claims.email,
        })
    }
}

/// Extract the token from a `Bearer` authorization value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
