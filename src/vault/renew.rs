use crate::{cli::globals::GlobalArgs, vault};
use anyhow::{anyhow, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::future::Future;
use tokio::{
    sync::mpsc,
    time::{sleep, Duration},
};
use tracing::{debug, error, instrument, warn};

/// Renew a Vault token
#[instrument(skip(token))]
async fn renew_token(url: &str, token: &SecretString, increment: Option<u64>) -> Result<u64> {
    let renew_url = vault::endpoint_url(url, "/v1/auth/token/renew-self")?;

    let payload = json!({
        "increment": increment.unwrap_or(0)
    });

    let response = vault::client()?
        .post(&renew_url)
        .json(&payload)
        .header("X-Vault-Token", token.expose_secret())
        .send()
        .await?;

    let json_response: Value = vault::check_response(&renew_url, response)
        .await?
        .json()
        .await?;

    json_response["auth"]["lease_duration"]
        .as_u64()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_duration found"))
}

#[instrument(skip(token))]
async fn renew_db_lease(
    url: &str,
    token: &SecretString,
    lease_id: &str,
    increment: u64,
) -> Result<u64> {
    let renew_url = vault::endpoint_url(url, "/v1/sys/leases/renew")?;

    let payload = json!({
        "lease_id": lease_id,
        "increment": increment
    });

    let response = vault::client()?
        .put(&renew_url)
        .json(&payload)
        .header("X-Vault-Token", token.expose_secret())
        .send()
        .await?;

    let json_response: Value = vault::check_response(&renew_url, response)
        .await?
        .json()
        .await?;

    json_response["lease_duration"]
        .as_u64()
        .ok_or_else(|| anyhow!("Error parsing JSON response: no lease_duration found"))
}

/// Keep renewing something with a lease: up to 3 attempts with exponential
/// backoff, then sleep 70-90% of the returned lease. Signals `tx` and stops
/// when all attempts fail.
async fn renew_loop<F, Fut>(what: &'static str, tx: mpsc::UnboundedSender<()>, mut renew: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64>>,
{
    let mut rng = StdRng::from_entropy();

    loop {
        let mut jittered_lease_duration = Duration::default();

        for attempt in 1..=3 {
            let backoff_time = 2u64.pow(attempt - 1);

            if attempt > 1 {
                warn!("Backing off for {} seconds", backoff_time);
                sleep(Duration::from_secs(backoff_time)).await;
            }

            match renew().await {
                Ok(lease_duration) => {
                    let factor = rng.gen_range(70..90);

                    jittered_lease_duration = Duration::from_secs(lease_duration * factor / 100);

                    break;
                }

                Err(e) => {
                    error!("Failed to renew {}: {}", what, e);

                    if attempt == 3 {
                        error!("Failed to renew {} after 3 attempts: {}", what, e);
                        let _ = tx.send(());
                        return;
                    }
                }
            }
        }

        debug!(
            "Will renew {} in {} seconds",
            what,
            jittered_lease_duration.as_secs()
        );

        sleep(jittered_lease_duration).await;
    }
}

/// Keep the Vault token and DB lease alive.
///
/// The Vault token must outlive startup: the signing secret is fetched again
/// through it whenever an earlier fetch failed.
/// # Errors
/// Returns an error if the initial renewal task setup fails.
#[instrument(skip(globals, tx))]
pub async fn try_renew(globals: &GlobalArgs, tx: mpsc::UnboundedSender<()>) -> Result<()> {
    tokio::spawn({
        let url = globals.vault_url.clone();
        let token = globals.vault_token.clone();
        let tx = tx.clone();

        async move {
            renew_loop("token", tx, || renew_token(&url, &token, None)).await;
        }
    });

    if !globals.vault_db_lease_id.is_empty() {
        tokio::spawn({
            let url = globals.vault_url.clone();
            let token = globals.vault_token.clone();
            let lease_id = globals.vault_db_lease_id.clone();
            let increment = globals.vault_db_lease_duration;

            async move {
                renew_loop("DB lease", tx, || {
                    renew_db_lease(&url, &token, &lease_id, increment)
                })
                .await;
            }
        });
    }

    Ok(())
}
