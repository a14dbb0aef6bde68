use std::env;

/// Connection settings for the huddle database.
///
/// The URL resolves from `HUDDLE_DATABASE_URL`, falling back to a local
/// default. Name extraction understands query-string suffixes such as
/// `?sslmode=disable`.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// The connection URL used when nothing else is configured.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/huddle";

    /// Build a config from the environment, defaulting when unset.
    pub fn from_env() -> Self {
        Self::new(env::var("HUDDLE_DATABASE_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_owned()))
    }

    /// Build a config from an explicit URL (tests, CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// The database name: the final path segment of the URL with any query
    /// string stripped. `None` when the URL carries no name at all.
    pub fn database_name(&self) -> Option<&str> {
        let tail = self.database_url.rsplit('/').next()?;
        let name = match tail.split_once('?') {
            Some((name, _)) => name,
            None => tail,
        };
        (!name.is_empty()).then_some(name)
    }

    /// The same server with the database swapped for `postgres`, for
    /// issuing `CREATE DATABASE` before the target exists.
    pub fn maintenance_url(&self) -> String {
        match self.database_url.rfind('/') {
            Some(pos) => format!("{}/postgres", &self.database_url[..pos]),
            None => self.database_url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
