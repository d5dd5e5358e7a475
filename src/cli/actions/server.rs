use crate::{
    accounts::AccountService,
    api::{self, AppOptions},
    cli::{actions::connect, commands::database, telemetry},
    store::{PgAccountStore, schema},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub database: database::Options,
    pub static_dir: Option<PathBuf>,
    pub todo_dir: Option<PathBuf>,
    pub admin_token: Option<SecretString>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let pool = connect(&args.database).await?;

    schema::ensure_schema(&pool)
        .await
        .context("Failed to create account schema")?;

    let store = Arc::new(PgAccountStore::new(pool.clone()));
    let service = AccountService::new(store)?;

    let options = AppOptions {
        static_dir: args.static_dir,
        todo_dir: args.todo_dir,
        admin_token: args.admin_token,
    };

    let result = api::serve(args.port, service, options).await;

    pool.close().await;
    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let describe_dir = |dir: &Option<PathBuf>| {
        dir.as_ref()
            .map_or_else(|| "none".to_string(), |path| path.display().to_string())
    };
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", args.database.redacted_dsn()),
        (
            "db_max_connections",
            args.database.max_connections.to_string(),
        ),
        (
            "db_acquire_timeout",
            format!("{}s", args.database.acquire_timeout.as_secs()),
        ),
        ("static_dir", describe_dir(&args.static_dir)),
        ("todo_dir", describe_dir(&args.todo_dir)),
        ("admin_token_set", args.admin_token.is_some().to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_commit_truncates_long_hashes() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("abc"), "abc");
        assert_eq!(short_commit("unknown"), "unknown");
    }
}
