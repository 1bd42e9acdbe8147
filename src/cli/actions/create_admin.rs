use crate::api::{
    self,
    handlers::auth::{
        AuthError, AuthService, NewAdmin, NoopRateLimiter, PgStore, ProvisionOutcome,
    },
};
use anyhow::{anyhow, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};

#[derive(Debug)]
pub struct Args {
    pub dsn: SecretString,
    pub store_timeout_seconds: u64,
    pub new_admin: NewAdmin,
}

/// Execute the create-admin action.
/// # Errors
/// Returns an error if the database is unreachable, the input is invalid or
/// the insert fails. An existing username is not an error.
pub async fn execute(args: Args) -> Result<()> {
    let pool = api::connect(&args.dsn).await?;
    let store = Arc::new(PgStore::new(pool));
    let service = AuthService::new(store.clone(), store, Arc::new(NoopRateLimiter))
        .with_store_timeout(Duration::from_secs(args.store_timeout_seconds));

    println!("{}", provision(&service, args.new_admin).await?);
    Ok(())
}

async fn provision(service: &AuthService, new_admin: NewAdmin) -> Result<String> {
    let username = new_admin.username.clone();
    match service.create_admin(new_admin).await {
        Ok(ProvisionOutcome::Created(admin)) => Ok(format!(
            "Admin user {} created successfully ({})",
            admin.username, admin.id
        )),
        Ok(ProvisionOutcome::Exists) => Ok(format!("Admin user {username} already exists")),
        Err(AuthError::Validation(message)) => Err(anyhow!("Invalid admin: {message}")),
        Err(AuthError::Internal(err)) => Err(err.context("Failed to create admin user")),
    }
}
