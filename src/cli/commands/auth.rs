use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

use crate::api::handlers::auth::{
    AuthConfig, Environment, MAX_LOCKOUT_WINDOW_SECONDS, MAX_SESSION_TTL_SECONDS,
};

pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_LOCKOUT_WINDOW_SECONDS: &str = "lockout-window-seconds";
pub const ARG_MAX_LOGIN_ATTEMPTS: &str = "max-login-attempts";
pub const ARG_DB_TIMEOUT_SECONDS: &str = "db-timeout-seconds";
pub const ARG_SESSION_SWEEP_SECONDS: &str = "session-sweep-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_throttle_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment; production marks the session cookie Secure")
                .env("SHOPKEEPER_ENVIRONMENT")
                .default_value("development")
                .value_parser(|value: &str| value.parse::<Environment>()),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Admin session lifetime in seconds")
                .env("SHOPKEEPER_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_SESSION_SWEEP_SECONDS)
                .long(ARG_SESSION_SWEEP_SECONDS)
                .help("Interval for purging expired sessions in seconds (0 disables)")
                .env("SHOPKEEPER_SESSION_SWEEP_SECONDS")
                .default_value("0")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_DB_TIMEOUT_SECONDS)
                .long(ARG_DB_TIMEOUT_SECONDS)
                .help("Timeout for each session or credential store call in seconds")
                .env("SHOPKEEPER_DB_TIMEOUT_SECONDS")
                .global(true)
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

fn with_throttle_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOCKOUT_WINDOW_SECONDS)
                .long(ARG_LOCKOUT_WINDOW_SECONDS)
                .help("Window for counting failed logins per username in seconds")
                .env("SHOPKEEPER_LOCKOUT_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_LOCKOUT_WINDOW_SECONDS)),
        )
        .arg(
            Arg::new(ARG_MAX_LOGIN_ATTEMPTS)
                .long(ARG_MAX_LOGIN_ATTEMPTS)
                .help("Login attempts allowed per username within the window")
                .env("SHOPKEEPER_MAX_LOGIN_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
}

/// Build the auth configuration from parsed arguments.
///
/// # Errors
/// Returns an error if a defaulted argument is unexpectedly missing.
pub fn parse(matches: &ArgMatches) -> Result<AuthConfig> {
    let environment = matches
        .get_one::<Environment>(ARG_ENVIRONMENT)
        .copied()
        .context("missing required argument: --environment")?;
    let session_ttl_seconds = matches
        .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
        .copied()
        .context("missing required argument: --session-ttl-seconds")?;
    let lockout_window_seconds = matches
        .get_one::<i64>(ARG_LOCKOUT_WINDOW_SECONDS)
        .copied()
        .context("missing required argument: --lockout-window-seconds")?;
    let max_login_attempts = matches
        .get_one::<u32>(ARG_MAX_LOGIN_ATTEMPTS)
        .copied()
        .context("missing required argument: --max-login-attempts")?;
    let store_timeout_seconds = db_timeout_seconds(matches)?;
    let session_sweep_seconds = matches
        .get_one::<u64>(ARG_SESSION_SWEEP_SECONDS)
        .copied()
        .unwrap_or(0);

    Ok(AuthConfig::new(environment)
        .with_session_ttl_seconds(session_ttl_seconds)
        .with_lockout_window_seconds(lockout_window_seconds)
        .with_max_login_attempts(max_login_attempts)
        .with_store_timeout_seconds(store_timeout_seconds)
        .with_session_sweep_seconds(session_sweep_seconds))
}

/// # Errors
/// Returns an error if `--db-timeout-seconds` is missing.
pub fn db_timeout_seconds(matches: &ArgMatches) -> Result<u64> {
    matches
        .get_one::<u64>(ARG_DB_TIMEOUT_SECONDS)
        .copied()
        .context("missing required argument: --db-timeout-seconds")
}
