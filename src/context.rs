//! Per-request correlation ("transaction uuid") propagation.
//!
//! Every inbound operation gets one [`CorrelationId`]. The id is installed as
//! a tokio task-local for the lifetime of the operation's future, so any code
//! awaited from it can read it with [`current`] without threading it through
//! function arguments. Tasks spawned through [`spawn`] and [`spawn_blocking`]
//! inherit the id of the spawning operation; plain `tokio::spawn` does not.

use std::{fmt, future::Future, sync::Arc};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Header carrying the correlation id in and out of the service.
pub const TRANSACTION_HEADER: &str = "transaction-uuid";

const MAX_INBOUND_LEN: usize = 128;

tokio::task_local! {
    static TRANSACTION: CorrelationId;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Fresh random id (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Run `future` with this id as the ambient correlation id.
    pub async fn scope<F>(self, future: F) -> F::Output
    where
        F: Future,
    {
        TRANSACTION.scope(self, future).await
    }

    /// Synchronous counterpart of [`CorrelationId::scope`].
    pub fn sync_scope<F, R>(self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        TRANSACTION.sync_scope(self, f)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pick the correlation id for a new operation.
///
/// An inbound value is reused when it is a plausible token (non-empty, at most
/// 128 visible ASCII characters); anything else is replaced by a generated id.
#[must_use]
pub fn begin(inbound: Option<&str>) -> CorrelationId {
    match inbound.map(str::trim) {
        Some(value)
            if !value.is_empty()
                && value.len() <= MAX_INBOUND_LEN
                && value.bytes().all(|b| b.is_ascii_graphic()) =>
        {
            CorrelationId(Arc::from(value))
        }
        _ => CorrelationId::generate(),
    }
}

/// The id of the operation currently executing, if any.
#[must_use]
pub fn current() -> Option<CorrelationId> {
    TRANSACTION.try_with(Clone::clone).ok()
}

/// `current()` rendered for log lines and error messages.
#[must_use]
pub fn current_or_none() -> String {
    current().map_or_else(|| "none".to_string(), |id| id.to_string())
}

/// `tokio::spawn` that carries the current correlation id into the new task.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match current() {
        Some(id) => tokio::spawn(TRANSACTION.scope(id, future)),
        None => tokio::spawn(future),
    }
}

/// `tokio::task::spawn_blocking` that carries the current correlation id.
pub fn spawn_blocking<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    match current() {
        Some(id) => tokio::task::spawn_blocking(move || TRANSACTION.sync_scope(id, f)),
        None => tokio::task::spawn_blocking(f),
    }
}
