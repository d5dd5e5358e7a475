pub mod server;
pub mod setup;

// Single dispatch point for `Action`, kept apart so this module stays small.
mod run;

use crate::cli::commands::database;
use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::debug;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    Setup(setup::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}

/// Open the connection pool described by the database options.
async fn connect(options: &database::Options) -> Result<PgPool> {
    let dsn = options.dsn()?;

    debug!(
        dsn = %options.redacted_dsn(),
        max_connections = options.max_connections,
        "connecting to database"
    );

    PgPoolOptions::new()
        .max_connections(options.max_connections)
        .acquire_timeout(options.acquire_timeout)
        .test_before_acquire(true)
        .connect(dsn.as_str())
        .await
        .context("Failed to connect to database")
}
