//! Map parsed arguments to the action the binary should run.

use crate::cli::actions::{create_admin, server, Action};
use crate::cli::commands::{admin, auth, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    if let Some(sub_matches) = matches.subcommand_matches(admin::CREATE_ADMIN) {
        return Ok(Action::CreateAdmin(create_admin::Args {
            dsn: dsn(sub_matches)?,
            store_timeout_seconds: auth::db_timeout_seconds(sub_matches)?,
            new_admin: admin::parse(sub_matches)?,
        }));
    }

    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    Ok(Action::Server(server::Args {
        port,
        dsn: dsn(matches)?,
        auth_config: auth::parse(matches)?,
    }))
}

fn dsn(matches: &ArgMatches) -> Result<SecretString> {
    matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --dsn")
}
