use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::api::handlers::auth::NewAdmin;

pub const CREATE_ADMIN: &str = "create-admin";

#[must_use]
pub fn command() -> Command {
    Command::new(CREATE_ADMIN)
        .about("Provision an administrator account")
        .arg(
            Arg::new("username")
                .long("username")
                .help("Login name, 3 to 50 characters")
                .env("SHOPKEEPER_ADMIN_USERNAME")
                .required(true),
        )
        .arg(
            Arg::new("email")
                .long("email")
                .help("Contact email")
                .env("SHOPKEEPER_ADMIN_EMAIL")
                .required(true),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("Initial password, at least 6 characters")
                .env("SHOPKEEPER_ADMIN_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("first-name")
                .long("first-name")
                .help("Given name"),
        )
        .arg(
            Arg::new("last-name")
                .long("last-name")
                .help("Family name"),
        )
}

/// # Errors
/// Returns an error if a required argument is missing.
pub fn parse(matches: &ArgMatches) -> Result<NewAdmin> {
    let required = |name: &str| {
        matches
            .get_one::<String>(name)
            .cloned()
            .with_context(|| format!("missing required argument: --{name}"))
    };

    Ok(NewAdmin {
        username: required("username")?,
        email: required("email")?,
        password: SecretString::from(required("password")?),
        first_name: matches.get_one::<String>("first-name").cloned(),
        last_name: matches.get_one::<String>("last-name").cloned(),
    })
}
