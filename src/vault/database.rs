use crate::{cli::globals::GlobalArgs, vault};
use anyhow::{anyhow, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::instrument;

/// Vault database role the service reads dynamic credentials from.
pub const DB_ROLE: &str = "authgate";

/// Get DB credentials from Vault
/// # Errors
/// Returns an error if the Vault request fails or the response is missing the lease or credentials.
#[instrument(skip(globals))]
pub async fn database_creds(globals: &mut GlobalArgs) -> Result<()> {
    let db_creds = vault::endpoint_url(&globals.vault_url, &format!("/v1/database/creds/{DB_ROLE}"))?;

    let response = vault::client()?
        .get(&db_creds)
        .header("X-Vault-Token", globals.vault_token.expose_secret())
        .send()
        .await?;

    let json_response: Value = vault::check_response(&db_creds, response)
        .await?
        .json()
        .await?;

    let lease_id = json_response["lease_id"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_id found"))?;
    globals.vault_db_lease_id = lease_id.to_string();

    let lease_duration = json_response["lease_duration"]
        .as_u64()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_duration found"))?;
    globals.vault_db_lease_duration = lease_duration;

    let username = json_response["data"]["username"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no username found"))?;
    globals.vault_db_username = username.to_string();

    let password = json_response["data"]["password"]
        .as_str()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no password found"))?;
    globals.vault_db_password = SecretString::from(password);

    Ok(())
}
