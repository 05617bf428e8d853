//! User directory: where credential records are looked up and created.

pub mod memory;
pub mod postgres;

pub use self::memory::MemoryDirectory;
pub use self::postgres::PgDirectory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Persisted identity. `password_hash` is a bcrypt hash, never the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub active: bool,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"***")
            .field("active", &self.active)
            .finish()
    }
}

#[derive(Clone)]
pub struct NewCredential {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Another record already owns the email.
    #[error("email already registered")]
    Duplicate,
    #[error("user directory failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Duplicate,
            _ => Self::Backend(e.to_string()),
        }
    }
}

/// External store of credential records. Emails passed in are already
/// normalized.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, DirectoryError>;

    /// Create a record; must fail with [`DirectoryError::Duplicate`] when the
    /// email is taken, even if a concurrent caller checked first.
    async fn create(&self, new: NewCredential) -> Result<Credential, DirectoryError>;
}
