//! Sign-up and sign-in.
//!
//! [`CredentialService`] owns the write path: it checks email uniqueness,
//! hashes passwords with bcrypt and issues bearer tokens signed with the secret
//! held by the shared [`SecretProvider`]. The read path lives in
//! [`token::TokenValidator`], which consults the same provider.

pub mod error;
pub mod password;
pub mod token;

pub use self::error::AuthError;
pub use self::token::{Claims, Identity, TokenValidator};

use crate::{
    context,
    directory::{Credential, NewCredential, UserDirectory},
    secrets::SecretProvider,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument};

/// Normalized form used for lookups and storage.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct CredentialService {
    directory: Arc<dyn UserDirectory>,
    secrets: Arc<SecretProvider>,
    hash_cost: u32,
    // verified against when the email is unknown, so both failures cost one bcrypt check
    decoy_hash: OnceCell<String>,
}

impl CredentialService {
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>, secrets: Arc<SecretProvider>) -> Self {
        Self {
            directory,
            secrets,
            hash_cost: password::DEFAULT_COST,
            decoy_hash: OnceCell::new(),
        }
    }

    /// bcrypt work factor for new hashes.
    #[must_use]
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Register a new credential record.
    ///
    /// # Errors
    /// `Conflict` if the email is already registered (including when a
    /// concurrent sign-up wins the race in the directory), `Hashing` or
    /// `Directory` on infrastructure failures.
    #[instrument(skip(self, name, raw_password))]
    pub async fn sign_up(
        &self,
        email: &str,
        name: &str,
        raw_password: &str,
    ) -> Result<Credential, AuthError> {
        let transaction = context::current_or_none();
        let email = normalize_email(email);
        info!("[{}] - Creating user {}", transaction, email);

        if self.directory.find_by_email(&email).await?.is_some() {
            debug!("[{}] - Email is already taken.", transaction);
            return Err(AuthError::Conflict);
        }

        let password_hash = password::hash(raw_password.to_string(), self.hash_cost).await?;

        let created = self
            .directory
            .create(NewCredential {
                email,
                name: name.trim().to_string(),
                password_hash,
            })
            .await
            .map_err(|e| {
                debug!("[{}] - Directory refused the new user: {}", transaction, e);
                AuthError::from(e)
            })?;

        info!("[{}] - Created user {}", transaction, created.id);

        Ok(created)
    }

    /// Authenticate and issue a one-hour bearer token.
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown email or a wrong password (the two
    /// are indistinguishable), `ServiceUnavailable` when the signing secret
    /// cannot be obtained, `Directory` on lookup failures.
    #[instrument(skip(self, raw_password))]
    pub async fn sign_in(&self, email: &str, raw_password: &str) -> Result<String, AuthError> {
        let transaction = context::current_or_none();
        let email = normalize_email(email);
        info!("[{}] - Authenticating user {}", transaction, email);

        let Some(user) = self.directory.find_by_email(&email).await? else {
            if let Ok(decoy) = self.decoy_hash().await {
                let _ = password::verify(raw_password.to_string(), decoy).await;
            }
            debug!("[{}] - Invalid credentials.", transaction);
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify(raw_password.to_string(), user.password_hash.clone()).await {
            debug!("[{}] - Invalid credentials.", transaction);
            return Err(AuthError::InvalidCredentials);
        }

        let secret = self.secrets.get().await.map_err(|e| {
            error!("[{}] - Signing secret is not available: {}", transaction, e);
            AuthError::ServiceUnavailable(e)
        })?;

        let identity = Identity {
            id: user.id.to_string(),
            email: user.email,
        };

        token::sign(
            &identity,
            token::now_unix_seconds(),
            secret.expose_secret().as_bytes(),
        )
        .map_err(|e| {
            error!("[{}] - Failed to sign token: {}", transaction, e);
            AuthError::Signing(e)
        })
    }
}

impl CredentialService {
    /// Hash of a random password at the configured cost, computed once.
    async fn decoy_hash(&self) -> Result<String, AuthError> {
        self.decoy_hash
            .get_or_try_init(|| password::hash(uuid::Uuid::new_v4().to_string(), self.hash_cost))
            .await
            .cloned()
    }
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("secrets", &self.secrets)
            .field("hash_cost", &self.hash_cost)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        directory::{DirectoryError, MemoryDirectory},
        secrets::{
            tests::{secret_json, MockStore},
            SecretError, StoreError, DEFAULT_SECRET_NAME,
        },
    };
    use async_trait::async_trait;

    const SECRET: &str = "unit-test-secret";

    fn service_with(store: MockStore) -> (CredentialService, Arc<MockStore>, Arc<MemoryDirectory>) {
        let store = Arc::new(store);
        let directory = Arc::new(MemoryDirectory::new());
        let provider = Arc::new(SecretProvider::new(store.clone(), DEFAULT_SECRET_NAME));
        let service = CredentialService::new(directory.clone(), provider).with_hash_cost(4);
        (service, store, directory)
    }

    fn service() -> CredentialService {
        service_with(MockStore::with_secret(SECRET)).0
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ann@X.Com "), "ann@x.com");
    }

    #[tokio::test]
    async fn sign_up_stores_hash_not_password() {
        let service = service();
        let created = service.sign_up("a@x.com", "Ann", "Passw0rd!").await.unwrap();

        assert_eq!(created.email, "a@x.com");
        assert_eq!(created.name, "Ann");
        assert!(created.active);
        assert_ne!(created.password_hash, "Passw0rd!");
        assert!(created.password_hash.starts_with("$2b$"));
    }

    #[tokio::test]
    async fn sign_up_default_cost_is_ten() {
        let directory = Arc::new(MemoryDirectory::new());
        let provider = Arc::new(SecretProvider::new(
            Arc::new(MockStore::with_secret(SECRET)),
            DEFAULT_SECRET_NAME,
        ));
        let created = CredentialService::new(directory, provider)
            .sign_up("a@x.com", "Ann", "Passw0rd!")
            .await
            .unwrap();

        assert!(created.password_hash.starts_with("$2b$10$"));
    }

    #[tokio::test]
    async fn second_sign_up_conflicts_regardless_of_case() {
        let service = service();
        service.sign_up("a@x.com", "Ann", "Passw0rd!").await.unwrap();

        for email in ["a@x.com", "A@X.COM", " a@x.com "] {
            assert!(matches!(
                service.sign_up(email, "Ann2", "Other1!").await,
                Err(AuthError::Conflict)
            ));
        }
    }

    #[tokio::test]
    async fn sign_up_does_not_touch_the_secret() {
        let (service, store, _) = service_with(MockStore::new(vec![]));
        service.sign_up("a@x.com", "Ann", "Passw0rd!").await.unwrap();
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn sign_in_issues_token_matching_record() {
        let service = service();
        let created = service.sign_up("a@x.com", "Ann", "Passw0rd!").await.unwrap();

        let token = service.sign_in("A@x.com", "Passw0rd!").await.unwrap();
        let claims = token::verify(&token, SECRET.as_bytes()).unwrap();

        assert_eq!(claims.id, created.id.to_string());
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, token::TOKEN_TTL_SECONDS);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let service = service();
        service.sign_up("a@x.com", "Ann", "Passw0rd!").await.unwrap();

        let wrong_password = service.sign_in("a@x.com", "wrong").await.unwrap_err();
        let unknown_user = service.sign_in("nobody@x.com", "wrong").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn bad_credentials_are_checked_before_the_secret() {
        let (service, store, _) = service_with(MockStore::new(vec![]));
        assert!(matches!(
            service.sign_in("nobody@x.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn missing_secret_is_service_unavailable() {
        let (service, _, _) = service_with(MockStore::new(vec![
            Err(StoreError::Transport("connection reset".to_string())),
            Ok(Some(secret_json(SECRET))),
        ]));
        service.sign_up("a@x.com", "Ann", "Passw0rd!").await.unwrap();

        assert!(matches!(
            service.sign_in("a@x.com", "Passw0rd!").await,
            Err(AuthError::ServiceUnavailable(SecretError::Fetch(_)))
        ));
        // not cached: the next attempt fetches again and succeeds
        assert!(service.sign_in("a@x.com", "Passw0rd!").await.is_ok());
    }

    #[tokio::test]
    async fn sign_in_and_validate_share_one_secret_fetch() {
        let (service, store, _) = service_with(MockStore::with_secret(SECRET));
        service.sign_up("a@x.com", "Ann", "Passw0rd!").await.unwrap();
        let validator = TokenValidator::new(service.secrets.clone());

        let token = service.sign_in("a@x.com", "Passw0rd!").await.unwrap();
        let identity = validator.validate(Some(&format!("Bearer {token}"))).await.unwrap();

        assert_eq!(identity.email, "a@x.com");
        assert_eq!(store.calls(), 1);
    }

    /// Directory whose lookup never sees the record, so uniqueness is only
    /// enforced at insert time, as with two racing sign-ups.
    struct RacingDirectory(MemoryDirectory);

    #[async_trait]
    impl UserDirectory for RacingDirectory {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Credential>, DirectoryError> {
            Ok(None)
        }

        async fn create(&self, new: NewCredential) -> Result<Credential, DirectoryError> {
            self.0.create(new).await
        }
    }

    #[tokio::test]
    async fn losing_a_sign_up_race_is_a_conflict() {
        let provider = Arc::new(SecretProvider::new(
            Arc::new(MockStore::with_secret(SECRET)),
            DEFAULT_SECRET_NAME,
        ));
        let service = CredentialService::new(
            Arc::new(RacingDirectory(MemoryDirectory::new())),
            provider,
        )
        .with_hash_cost(4);

        service.sign_up("a@x.com", "Ann", "Passw0rd!").await.unwrap();
        assert!(matches!(
            service.sign_up("a@x.com", "Ann", "Passw0rd!").await,
            Err(AuthError::Conflict)
        ));
    }

    #[tokio::test]
    async fn concurrent_sign_ins_share_one_secret_fetch() {
        let (service, store, _) = service_with(MockStore::with_secret(SECRET));
        service.sign_up("a@x.com", "Ann", "Passw0rd!").await.unwrap();
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.sign_in("a@x.com", "Passw0rd!").await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_email_still_pays_for_a_hash_check() {
        let (service, store, _) = service_with(MockStore::new(vec![]));
        assert!(!service.decoy_hash.initialized());

        assert!(matches!(
            service.sign_in("nobody@x.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));

        let decoy = service.decoy_hash.get().cloned().unwrap();
        assert!(decoy.starts_with("$2b$04$"));
        assert!(!password::verify("wrong".to_string(), decoy).await);
        assert_eq!(store.calls(), 0);
    }
}
