use super::{Credential, DirectoryError, NewCredential, UserDirectory};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Process-local directory keyed by email.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<String, Credential>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, DirectoryError> {
        Ok(self.users.read().get(email).cloned())
    }

    async fn create(&self, new: NewCredential) -> Result<Credential, DirectoryError> {
        let mut users = self.users.write();
        if users.contains_key(&new.email) {
            return Err(DirectoryError::Duplicate);
        }

        let credential = Credential {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            active: true,
        };
        users.insert(credential.email.clone(), credential.clone());

        Ok(credential)
    }
}
