use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_VAULT_URL: &str = "vault-url";
pub const ARG_VAULT_ROLE_ID: &str = "vault-role-id";
pub const ARG_VAULT_SECRET_ID: &str = "vault-secret-id";
pub const ARG_VAULT_WRAPPED_TOKEN: &str = "vault-wrapped-token";
pub const ARG_VAULT_KV_MOUNT: &str = "vault-kv-mount";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VAULT_URL)
                .long(ARG_VAULT_URL)
                .help("Vault approle login URL, example: https://vault.tld:8200/v1/auth/<approle>/login")
                .env("AUTHGATE_VAULT_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_VAULT_ROLE_ID)
                .long(ARG_VAULT_ROLE_ID)
                .help("Vault role id")
                .env("AUTHGATE_VAULT_ROLE_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_VAULT_SECRET_ID)
                .long(ARG_VAULT_SECRET_ID)
                .help("Vault secret id")
                .env("AUTHGATE_VAULT_SECRET_ID")
                .conflicts_with(ARG_VAULT_WRAPPED_TOKEN)
                .required_unless_present(ARG_VAULT_WRAPPED_TOKEN),
        )
        .arg(
            Arg::new(ARG_VAULT_WRAPPED_TOKEN)
                .long(ARG_VAULT_WRAPPED_TOKEN)
                .help("Vault wrapped token")
                .env("AUTHGATE_VAULT_WRAPPED_TOKEN"),
        )
        .arg(
            Arg::new(ARG_VAULT_KV_MOUNT)
                .long(ARG_VAULT_KV_MOUNT)
                .help("Vault KV-v2 mount holding the signing secret")
                .env("AUTHGATE_VAULT_KV_MOUNT")
                .default_value("secret"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub role_id: String,
    pub secret_id: Option<String>,
    pub wrapped_token: Option<String>,
    pub kv_mount: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a required Vault argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            url: matches
                .get_one::<String>(ARG_VAULT_URL)
                .cloned()
                .context("missing required argument: --vault-url")?,
            role_id: matches
                .get_one::<String>(ARG_VAULT_ROLE_ID)
                .cloned()
                .context("missing required argument: --vault-role-id")?,
            secret_id: matches.get_one::<String>(ARG_VAULT_SECRET_ID).cloned(),
            wrapped_token: matches.get_one::<String>(ARG_VAULT_WRAPPED_TOKEN).cloned(),
            kv_mount: matches
                .get_one::<String>(ARG_VAULT_KV_MOUNT)
                .cloned()
                .unwrap_or_else(|| "secret".to_string()),
        })
    }
}
