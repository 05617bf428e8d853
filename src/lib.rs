//! # Authgate (credential issuance)
//!
//! `authgate` registers users, authenticates them and issues short-lived
//! bearer tokens (HS256 JWT, one hour) signed with a secret held in Vault.
//!
//! ## Signing secret
//!
//! The secret is read from a Vault KV-v2 path (default `prod/jwt-secret`,
//! field `JWT_SECRET`) through a single [`secrets::SecretProvider`] shared by
//! sign-in and token validation. It is fetched once at startup (the server
//! refuses to start without it), concurrent first users share one fetch, and a
//! fetched secret is never refreshed. Failed fetches are retried on next use.
//!
//! ## Correlation
//!
//! Each request carries a `transaction-uuid` (taken from the inbound header or
//! generated). It is installed as a task-local by [`api::middleware`] and read
//! with [`context::current`] anywhere below the handler; it tags log lines and
//! error messages and is echoed in the response header.
//!
//! ## Credential failures
//!
//! Unknown emails and wrong passwords produce the same `401 Invalid
//! credentials.` response.

pub mod api;
pub mod auth;
pub mod cli;
pub mod context;
pub mod directory;
pub mod secrets;
pub mod vault;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
