//! Map validated CLI arguments to an [`Action`].

use crate::cli::actions::{Action, server, setup};
use crate::cli::commands::{self, ARG_PORT, CMD_SETUP, database};
use anyhow::{Context, Result};

/// Map validated CLI matches to an action; no subcommand runs the server.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((CMD_SETUP, sub_m)) => Ok(Action::Setup(setup::Args {
            database: database::Options::parse(sub_m)?,
        })),
        Some((other, _)) => Err(anyhow::anyhow!("unknown subcommand: {other}")),
        None => {
            let port = matches
                .get_one::<u16>(ARG_PORT)
                .copied()
                .context("missing required argument: --port")?;
            let server_opts = commands::server::Options::parse(matches);

            Ok(Action::Server(server::Args {
                port,
                database: database::Options::parse(matches)?,
                static_dir: server_opts.static_dir,
                todo_dir: server_opts.todo_dir,
                admin_token: server_opts.admin_token,
            }))
        }
    }
}
