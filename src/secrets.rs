//! Fetch-once access to the token signing secret.
//!
//! The secret lives in an external [`SecretStore`]. [`SecretProvider`] fetches
//! it on first use, hands the same in-flight result to every concurrent caller
//! and caches a successful value for the rest of the process lifetime. Failures
//! are not cached: the next caller starts a new fetch.

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Secret name used when none is configured.
pub const DEFAULT_SECRET_NAME: &str = "prod/jwt-secret";

/// JSON field holding the signing key inside the stored secret.
pub const DEFAULT_SECRET_FIELD: &str = "JWT_SECRET";

/// Failure talking to the secret store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("secret store unreachable: {0}")]
    Transport(String),
    #[error("secret store returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("secret store response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret {name} not found")]
    NotFound { name: String },
    #[error("secret {name} is malformed: {reason}")]
    Malformed { name: String, reason: String },
    #[error(transparent)]
    Fetch(#[from] StoreError),
}

/// External system holding secret material, queried by name.
///
/// Returns the raw secret string (a JSON document) or `None` when the store has
/// no value for `name`.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret_string(&self, name: &str) -> Result<Option<String>, StoreError>;
}

type Flight = watch::Receiver<Option<Result<SecretString, SecretError>>>;

enum State {
    Uninitialized,
    Fetching(Flight),
    Ready(SecretString),
}

/// Single-flight, cache-forever accessor for one named secret.
pub struct SecretProvider {
    store: Arc<dyn SecretStore>,
    name: String,
    field: String,
    state: Arc<Mutex<State>>,
}

impl SecretProvider {
    #[must_use]
    pub fn new(store: Arc<dyn SecretStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            field: DEFAULT_SECRET_FIELD.to_string(),
            state: Arc::new(Mutex::new(State::Uninitialized)),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once a fetch has succeeded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), State::Ready(_))
    }

    /// Return the signing secret, fetching it if it is not cached yet.
    ///
    /// # Errors
    /// `NotFound` when the store has no value, `Malformed` when the value is
    /// not a JSON object with the configured string field, and `Fetch` with the
    /// store's own error otherwise. Every caller waiting on the same fetch gets
    /// the same error.
    pub async fn get(&self) -> Result<SecretString, SecretError> {
        let mut flight = {
            let mut state = self.state.lock();
            match &*state {
                State::Ready(secret) => return Ok(secret.clone()),
                State::Fetching(flight) => flight.clone(),
                State::Uninitialized => {
                    let flight = self.start_fetch();
                    *state = State::Fetching(flight.clone());
                    flight
                }
            }
        };

        loop {
            if let Some(result) = flight.borrow_and_update().clone() {
                if let Err(e) = &result {
                    debug!(
                        "[{}] - Secret {} unavailable: {}",
                        crate::context::current_or_none(),
                        self.name,
                        e
                    );
                }
                return result;
            }
            if flight.changed().await.is_err() {
                // the fetch task went away without publishing; let the next caller retry
                let mut state = self.state.lock();
                if matches!(&*state, State::Fetching(current) if current.same_channel(&flight)) {
                    *state = State::Uninitialized;
                }
                return Err(SecretError::Fetch(StoreError::Transport(
                    "secret fetch aborted".to_string(),
                )));
            }
        }
    }

    // Caller holds the state lock.
    fn start_fetch(&self) -> Flight {
        let (tx, rx) = watch::channel(None);
        let store = self.store.clone();
        let name = self.name.clone();
        let field = self.field.clone();
        let state = self.state.clone();

        debug!("Fetching secret {}", name);

        // No correlation scope: one flight is shared by every waiter.
        tokio::spawn(async move {
            let result = fetch(store.as_ref(), &name, &field).await;

            {
                let mut state = state.lock();
                *state = match &result {
                    Ok(secret) => {
                        info!("Fetched secret {} from secret store", name);
                        State::Ready(secret.clone())
                    }
                    Err(e) => {
                        error!("Failed to fetch secret {}: {}", name, e);
                        State::Uninitialized
                    }
                };
            }

            if tx.send(Some(result)).is_err() {
                debug!("No waiters left for secret {}", name);
            }
        });

        rx
    }
}

impl std::fmt::Debug for SecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretProvider")
            .field("name", &self.name)
            .field("field", &self.field)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

async fn fetch(store: &dyn SecretStore, name: &str, field: &str) -> Result<SecretString, SecretError> {
    let Some(raw) = store.get_secret_string(name).await? else {
        warn!("Secret {} has no value", name);
        return Err(SecretError::NotFound {
            name: name.to_string(),
        });
    };

    extract_field(name, field, &SecretString::from(raw))
}

fn extract_field(name: &str, field: &str, raw: &SecretString) -> Result<SecretString, SecretError> {
    let malformed = |reason: String| SecretError::Malformed {
        name: name.to_string(),
        reason,
    };

    let json: Value = serde_json::from_str(raw.expose_secret())
        .map_err(|e| malformed(format!("not valid JSON: {e}")))?;

    match json.get(field).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(SecretString::from(value)),
        Some(_) => Err(malformed(format!("field {field} is empty"))),
        None => Err(malformed(format!("field {field} is missing"))),
    }
}
