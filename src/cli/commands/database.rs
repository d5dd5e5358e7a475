use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, time::Duration};
use url::Url;

pub const ARG_DB_HOST: &str = "db-host";
pub const ARG_DB_PORT: &str = "db-port";
pub const ARG_DB_USER: &str = "db-user";
pub const ARG_DB_PASSWORD: &str = "db-password";
pub const ARG_DB_NAME: &str = "db-name";
pub const ARG_DB_MAX_CONNECTIONS: &str = "db-max-connections";
pub const ARG_DB_ACQUIRE_TIMEOUT: &str = "db-acquire-timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DB_HOST)
                .long(ARG_DB_HOST)
                .help("PostgreSQL host")
                .env("ROSTER_DB_HOST")
                .default_value("localhost")
                .global(true),
        )
        .arg(
            Arg::new(ARG_DB_PORT)
                .long(ARG_DB_PORT)
                .help("PostgreSQL port")
                .env("ROSTER_DB_PORT")
                .default_value("5433")
                .value_parser(clap::value_parser!(u16))
                .global(true),
        )
        .arg(
            Arg::new(ARG_DB_USER)
                .long(ARG_DB_USER)
                .help("PostgreSQL user")
                .env("ROSTER_DB_USER")
                .default_value("postgres")
                .global(true),
        )
        .arg(
            Arg::new(ARG_DB_PASSWORD)
                .long(ARG_DB_PASSWORD)
                .help("PostgreSQL password")
                .env("ROSTER_DB_PASSWORD")
                .default_value("1234")
                .hide_default_value(true)
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_DB_NAME)
                .long(ARG_DB_NAME)
                .help("PostgreSQL database name")
                .env("ROSTER_DB_NAME")
                .default_value("postgres")
                .global(true),
        )
        .arg(
            Arg::new(ARG_DB_MAX_CONNECTIONS)
                .long(ARG_DB_MAX_CONNECTIONS)
                .help("Maximum number of pooled database connections")
                .env("ROSTER_DB_MAX_CONNECTIONS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..))
                .global(true),
        )
        .arg(
            Arg::new(ARG_DB_ACQUIRE_TIMEOUT)
                .long(ARG_DB_ACQUIRE_TIMEOUT)
                .help("Seconds to wait for a pooled connection")
                .env("ROSTER_DB_ACQUIRE_TIMEOUT")
                .default_value("5")
                .value_parser(clap::value_parser!(u64))
                .global(true),
        )
}

pub struct Options {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl Options {
    /// Parse database arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_string = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .with_context(|| format!("missing required argument: --{id}"))
        };

        Ok(Self {
            host: get_string(ARG_DB_HOST)?,
            port: matches.get_one::<u16>(ARG_DB_PORT).copied().unwrap_or(5433),
            user: get_string(ARG_DB_USER)?,
            password: SecretString::from(get_string(ARG_DB_PASSWORD)?),
            name: get_string(ARG_DB_NAME)?,
            max_connections: matches
                .get_one::<u32>(ARG_DB_MAX_CONNECTIONS)
                .copied()
                .unwrap_or(5),
            acquire_timeout: Duration::from_secs(
                matches
                    .get_one::<u64>(ARG_DB_ACQUIRE_TIMEOUT)
                    .copied()
                    .unwrap_or(5),
            ),
        })
    }

    /// Connection string with the credentials injected.
    ///
    /// # Errors
    /// Returns an error if the host or credentials do not form a valid URL.
    pub fn dsn(&self) -> Result<Url> {
        let mut dsn = Url::parse(&format!(
            "postgres://{}:{}/{}",
            self.host, self.port, self.name
        ))
        .with_context(|| format!("Invalid database host: {}", self.host))?;

        dsn.set_username(&self.user)
            .map_err(|()| anyhow!("Error setting username"))?;

        dsn.set_password(Some(self.password.expose_secret()))
            .map_err(|()| anyhow!("Error setting password"))?;

        Ok(dsn)
    }

    /// DSN safe for logs.
    #[must_use]
    pub fn redacted_dsn(&self) -> String {
        match self.dsn() {
            Ok(mut parsed) => {
                let _ = parsed.set_password(Some("REDACTED"));
                parsed.to_string()
            }
            Err(_) => "invalid-dsn".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn options(password: &str) -> Options {
        Options {
            host: "db.internal".to_string(),
            port: 5432,
            user: "roster".to_string(),
            password: SecretString::from(password.to_string()),
            name: "accounts".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn dsn_injects_credentials() {
        let dsn = options("p@ss/word").dsn().unwrap();
        assert_eq!(dsn.scheme(), "postgres");
        assert_eq!(dsn.host_str(), Some("db.internal"));
        assert_eq!(dsn.port(), Some(5432));
        assert_eq!(dsn.path(), "/accounts");
        assert_eq!(dsn.username(), "roster");
        assert_eq!(dsn.password(), Some("p%40ss%2Fword"));
    }

    #[test]
    fn redacted_dsn_and_debug_hide_password() {
        let opts = options("hunter22");
        assert!(!opts.redacted_dsn().contains("hunter22"));
        assert!(opts.redacted_dsn().contains("REDACTED"));
        assert!(!format!("{opts:?}").contains("hunter22"));
    }
}
