use crate::cli::{actions::connect, commands::database};
use crate::store::schema;
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub database: database::Options,
}

/// Create the account tables and exit.
/// # Errors
/// Returns an error if the database is unreachable or a schema statement fails.
pub async fn execute(args: Args) -> Result<()> {
    let pool = connect(&args.database).await?;

    schema::ensure_schema(&pool).await?;

    info!(
        "Account schema ready on {}",
        args.database.redacted_dsn()
    );

    pool.close().await;

    Ok(())
}
