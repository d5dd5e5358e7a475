use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::path::PathBuf;

pub const ARG_STATIC_DIR: &str = "static-dir";
pub const ARG_TODO_DIR: &str = "todo-dir";
pub const ARG_ADMIN_TOKEN: &str = "admin-token";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_STATIC_DIR)
                .long(ARG_STATIC_DIR)
                .help("Directory with the login/registration page bundle, served at /")
                .env("ROSTER_STATIC_DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_TODO_DIR)
                .long(ARG_TODO_DIR)
                .help("Directory with the todo list bundle, served at /todo-list")
                .env("ROSTER_TODO_DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_ADMIN_TOKEN)
                .long(ARG_ADMIN_TOKEN)
                .help("Bearer token required by /api/users and /api/stats")
                .long_help(
                    "Bearer token required by /api/users, /api/users/search and /api/stats. When unset those endpoints are open.",
                )
                .env("ROSTER_ADMIN_TOKEN")
                .hide_env_values(true),
        )
}

#[derive(Debug)]
pub struct Options {
    pub static_dir: Option<PathBuf>,
    pub todo_dir: Option<PathBuf>,
    pub admin_token: Option<SecretString>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let get_dir = |id: &str| {
            matches
                .get_one::<PathBuf>(id)
                .filter(|path| !path.as_os_str().is_empty())
                .cloned()
        };

        // An empty env var disables the gate rather than requiring an empty token.
        let admin_token = matches
            .get_one::<String>(ARG_ADMIN_TOKEN)
            .filter(|token| !token.trim().is_empty())
            .map(|token| SecretString::from(token.clone()));

        Self {
            static_dir: get_dir(ARG_STATIC_DIR),
            todo_dir: get_dir(ARG_TODO_DIR),
            admin_token,
        }
    }
}
