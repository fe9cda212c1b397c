use std::env;

use services::{DEFAULT_MAX_ATTEMPTS, PoolSettings};

use crate::db::normalize_sqlite_url;

const DEFAULT_DB_URL: &str = "quiz.sqlite3";
const DEFAULT_LOG: &str = "info";

/// Runtime settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_filter: String,
    pub max_commit_attempts: u32,
    pub pool: PoolSettings,
}

impl Config {
    /// Load settings, falling back to defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error if `QUIZ_MAX_COMMIT_ATTEMPTS` or `QUIZ_DB_MAX_CONNECTIONS`
    /// is set but not a number.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = normalize_sqlite_url(
            env::var("QUIZ_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.to_owned()),
        );

        let log_filter = env::var("QUIZ_LOG").unwrap_or_else(|_| DEFAULT_LOG.to_owned());

        let max_commit_attempts =
            parse_var("QUIZ_MAX_COMMIT_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let defaults = PoolSettings::default();
        let pool = defaults.with_max_connections(
            parse_var("QUIZ_DB_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
        );

        Ok(Self {
            database_url,
            log_filter,
            max_commit_attempts,
            pool,
        })
    }
}

fn parse_var(name: &str) -> anyhow::Result<Option<u32>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("invalid {name} value: {raw}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_location_is_absolute() {
        let url = normalize_sqlite_url(DEFAULT_DB_URL.to_owned());
        let path = url.strip_prefix("sqlite://").unwrap();
        assert!(std::path::Path::new(path).is_absolute(), "{url}");
        assert!(url.ends_with("/quiz.sqlite3"));
    }
}
