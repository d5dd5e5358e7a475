pub mod database;
pub mod logging;
pub mod server;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const CMD_SETUP: &str = "setup";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("roster")
        .about("User registration and login service")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("3000")
                .env("ROSTER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .subcommand(
            Command::new(CMD_SETUP)
                .about("Create the account tables if they do not exist, then exit"),
        );

    let command = server::with_args(command);
    let command = database::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const ENV_VARS: [&str; 12] = [
        "ROSTER_PORT",
        "ROSTER_DB_HOST",
        "ROSTER_DB_PORT",
        "ROSTER_DB_USER",
        "ROSTER_DB_PASSWORD",
        "ROSTER_DB_NAME",
        "ROSTER_DB_MAX_CONNECTIONS",
        "ROSTER_DB_ACQUIRE_TIMEOUT",
        "ROSTER_STATIC_DIR",
        "ROSTER_TODO_DIR",
        "ROSTER_ADMIN_TOKEN",
        "ROSTER_LOG_LEVEL",
    ];

    fn unset_all() -> Vec<(&'static str, Option<&'static str>)> {
        ENV_VARS.iter().map(|name| (*name, None)).collect()
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "roster");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("User registration and login service".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert!(command.find_subcommand(CMD_SETUP).is_some());
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(unset_all(), || {
            let matches = new().get_matches_from(vec!["roster"]);
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(3000));

            let db = database::Options::parse(&matches).unwrap();
            assert_eq!(db.host, "localhost");
            assert_eq!(db.port, 5433);
            assert_eq!(db.user, "postgres");
            assert_eq!(db.password.expose_secret(), "1234");
            assert_eq!(db.name, "postgres");
            assert_eq!(db.max_connections, 5);
            assert_eq!(db.acquire_timeout.as_secs(), 5);

            let srv = server::Options::parse(&matches);
            assert!(srv.static_dir.is_none());
            assert!(srv.todo_dir.is_none());
            assert!(srv.admin_token.is_none());
            assert!(matches.subcommand_name().is_none());
        });
    }

    #[test]
    fn test_check_flags() {
        temp_env::with_vars(unset_all(), || {
            let matches = new().get_matches_from(vec![
                "roster",
                "--port",
                "8080",
                "--db-host",
                "db.internal",
                "--db-port",
                "5432",
                "--db-max-connections",
                "20",
                "--static-dir",
                "public",
                "--admin-token",
                "s3cret",
            ]);
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8080));

            let db = database::Options::parse(&matches).unwrap();
            assert_eq!(db.host, "db.internal");
            assert_eq!(db.port, 5432);
            assert_eq!(db.max_connections, 20);

            let srv = server::Options::parse(&matches);
            assert_eq!(
                srv.static_dir.as_deref(),
                Some(std::path::Path::new("public"))
            );
            assert_eq!(
                srv.admin_token.as_ref().map(|token| token.expose_secret()),
                Some("s3cret")
            );
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("ROSTER_PORT", Some("443")),
                ("ROSTER_DB_HOST", Some("pg")),
                ("ROSTER_DB_PASSWORD", Some("from-env")),
                ("ROSTER_DB_ACQUIRE_TIMEOUT", Some("30")),
                ("ROSTER_TODO_DIR", Some("todo")),
                ("ROSTER_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["roster"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );

                let db = database::Options::parse(&matches).unwrap();
                assert_eq!(db.host, "pg");
                assert_eq!(db.password.expose_secret(), "from-env");
                assert_eq!(db.acquire_timeout.as_secs(), 30);

                let srv = server::Options::parse(&matches);
                assert_eq!(srv.todo_dir.as_deref(), Some(std::path::Path::new("todo")));
            },
        );
    }

    #[test]
    fn test_setup_subcommand_sees_database_args() {
        temp_env::with_vars(unset_all(), || {
            let matches =
                new().get_matches_from(vec!["roster", "setup", "--db-name", "accounts"]);
            assert_eq!(matches.subcommand_name(), Some(CMD_SETUP));

            let sub = matches.subcommand_matches(CMD_SETUP).unwrap();
            let db = database::Options::parse(sub).unwrap();
            assert_eq!(db.name, "accounts");
        });
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("ROSTER_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["roster"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(u8::try_from(index).unwrap())
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            temp_env::with_vars([("ROSTER_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["roster".to_string()];

                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(u8::try_from(index).unwrap())
                );
            });
        }
    }
}
