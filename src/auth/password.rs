//! bcrypt hashing, run off the async worker threads.

use super::AuthError;
use crate::context;
use tracing::error;

/// Work factor used for new hashes.
pub const DEFAULT_COST: u32 = 10;

/// # Errors
/// Returns `AuthError::Hashing` if bcrypt rejects the input or the blocking
/// task cannot complete.
pub async fn hash(password: String, cost: u32) -> Result<String, AuthError> {
    context::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| {
            error!("Password hashing task failed: {}", e);
            AuthError::Hashing(e.to_string())
        })?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Compare `password` against a stored bcrypt hash.
///
/// A stored hash that bcrypt cannot parse counts as a mismatch.
pub async fn verify(password: String, stored_hash: String) -> bool {
    match context::spawn_blocking(move || bcrypt::verify(password, &stored_hash)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            error!(
                "[{}] - Stored password hash is unusable: {}",
                context::current_or_none(),
                e
            );
            false
        }
        Err(e) => {
            error!("Password verification task failed: {}", e);
            false
        }
    }
}
