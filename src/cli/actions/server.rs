use crate::{
    api,
    auth::{CredentialService, TokenValidator},
    cli::{globals::GlobalArgs, telemetry},
    directory::PgDirectory,
    secrets::SecretProvider,
    vault,
};
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub vault_url: String,
    pub vault_role_id: String,
    pub vault_secret_id: Option<String>,
    pub vault_wrapped_token: Option<String>,
    pub vault_kv_mount: String,
    pub jwt_secret_name: String,
    pub jwt_secret_field: String,
    pub cors_origin: Option<String>,
}

/// Execute the server action.
///
/// The signing secret is loaded before the listener is bound; the server does
/// not start without it.
/// # Errors
/// Returns an error if Vault login fails, the signing secret or DB credentials cannot be fetched, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let mut globals = GlobalArgs::new(args.vault_url);

    // If vault wrapped token try to unwrap, otherwise use secret-id.
    let secret_id = if let Some(wrapped) = &args.vault_wrapped_token {
        vault::unwrap(&globals.vault_url, wrapped).await?
    } else {
        args.vault_secret_id
            .clone()
            .ok_or_else(|| anyhow!("Vault secret-id is required"))?
    };

    let (vault_token, _) =
        vault::approle_login(&globals.vault_url, &secret_id, &args.vault_role_id).await?;

    globals.set_token(SecretString::from(vault_token));

    let store = vault::VaultKv::new(
        &globals.vault_url,
        &args.vault_kv_mount,
        globals.vault_token.clone(),
    )?;
    let secrets = Arc::new(
        SecretProvider::new(Arc::new(store), &args.jwt_secret_name)
            .with_field(&args.jwt_secret_field),
    );

    secrets
        .get()
        .await
        .with_context(|| format!("Failed to load signing secret {}", args.jwt_secret_name))?;

    info!("Signing secret loaded from {}", secrets.name());

    // Get database username and password from Vault
    vault::database::database_creds(&mut globals)
        .await
        .context("Could not get database username and password")?;

    debug!("Global args: {:?}", globals);

    let mut dsn = Url::parse(&args.dsn)?;

    // Set username & password from GlobalArgs
    dsn.set_username(&globals.vault_db_username)
        .map_err(|()| anyhow!("Error setting username"))?;

    dsn.set_password(Some(globals.vault_db_password.expose_secret()))
        .map_err(|()| anyhow!("Error setting password"))?;

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.as_str())
        .await
        .context("Failed to connect to database")?;

    let credentials = Arc::new(CredentialService::new(
        Arc::new(PgDirectory::new(pool)),
        secrets.clone(),
    ));
    let tokens = Arc::new(TokenValidator::new(secrets.clone()));

    let (tx, rx) = mpsc::unbounded_channel();

    vault::renew::try_renew(&globals, tx).await?;

    let app = api::router(
        api::Services {
            credentials,
            tokens,
            secrets,
        },
        args.cors_origin.as_deref(),
    )?;

    let result = api::new(args.port, app, rx).await;

    telemetry::shutdown_tracer();

    result
}
