use crate::api::{self, handlers::auth::AuthConfig};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub auth_config: AuthConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        environment = %args.auth_config.environment(),
        session_ttl_seconds = args.auth_config.session_ttl_seconds(),
        "starting server"
    );

    api::new(args.port, &args.dsn, args.auth_config).await
}
