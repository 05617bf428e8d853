//! Map validated CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, vault};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let vault_opts = vault::Options::parse(matches)?;
    let auth_opts = auth::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        vault_url: vault_opts.url,
        vault_role_id: vault_opts.role_id,
        vault_secret_id: vault_opts.secret_id,
        vault_wrapped_token: vault_opts.wrapped_token,
        vault_kv_mount: vault_opts.kv_mount,
        jwt_secret_name: auth_opts.secret_name,
        jwt_secret_field: auth_opts.secret_field,
        cors_origin: auth_opts.cors_origin,
    }))
}
