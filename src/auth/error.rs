use crate::{directory::DirectoryError, secrets::SecretError};
use thiserror::Error;

/// Failures surfaced by sign-up, sign-in and token validation.
///
/// `InvalidCredentials` is returned both for unknown emails and for wrong
/// passwords; callers must not be able to tell the two apart.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Email is already taken.")]
    Conflict,
    #[error("Invalid credentials.")]
    InvalidCredentials,
    #[error("Unauthorized")]
    InvalidToken,
    #[error("Signing secret is not available.")]
    ServiceUnavailable(#[source] SecretError),
    #[error("User directory failure.")]
    Directory(#[source] DirectoryError),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Token signing failed.")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl From<DirectoryError> for AuthError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::Duplicate => Self::Conflict,
            e @ DirectoryError::Backend(_) => Self::Directory(e),
        }
    }
}
