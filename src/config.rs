use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_CATALOG_TTL_SECS: u64 = 300;
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 25;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL is not set; refusing to start without a data source")]
    MissingDatabaseUrl,
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// How long the team catalog may be served from memory
    pub catalog_ttl: Duration,
    /// Top-N used when a leaderboard caller does not pass a limit
    pub leaderboard_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests never touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let catalog_ttl_secs = parse_or("CATALOG_TTL_SECS", &lookup, DEFAULT_CATALOG_TTL_SECS)?;
        let leaderboard_limit = parse_or("LEADERBOARD_LIMIT", &lookup, DEFAULT_LEADERBOARD_LIMIT)?;
        if leaderboard_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "LEADERBOARD_LIMIT",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url,
            catalog_ttl: Duration::from_secs(catalog_ttl_secs),
            leaderboard_limit,
        })
    }
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_database_url_is_fatal() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingDatabaseUrl);

        let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "   ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingDatabaseUrl);
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "sqlite::memory:")])).unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.catalog_ttl, Duration::from_secs(300));
        assert_eq!(config.leaderboard_limit, 25);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite:data/fans.db"),
            ("CATALOG_TTL_SECS", "60"),
            ("LEADERBOARD_LIMIT", "10"),
        ]))
        .unwrap();
        assert_eq!(config.catalog_ttl, Duration::from_secs(60));
        assert_eq!(config.leaderboard_limit, 10);

        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite:data/fans.db"),
            ("CATALOG_TTL_SECS", "five"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CATALOG_TTL_SECS", .. }));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite:data/fans.db"),
            ("LEADERBOARD_LIMIT", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LEADERBOARD_LIMIT", .. }));
    }
}
