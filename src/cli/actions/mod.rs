pub mod create_admin;
pub mod server;

// Single place that maps an `Action` to its executor.
mod run;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    CreateAdmin(create_admin::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
