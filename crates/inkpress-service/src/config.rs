use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_SESSION_HOURS: i64 = 720;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_hours: i64,
    pub password_cost: u32,
    pub min_password_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_hours: DEFAULT_SESSION_HOURS,
            password_cost: bcrypt::DEFAULT_COST,
            min_password_len: MIN_PASSWORD_LEN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Public key every API client presents in the `apikey` header.
    pub api_key: String,
    pub bind: SocketAddr,
    pub request_timeout: Duration,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let database_url = required("DATABASE_URL")?;
        let api_key = required("INKPRESS_API_KEY")?;

        let bind_raw = lookup("INKPRESS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "INKPRESS_BIND",
            value: bind_raw.clone(),
        })?;

        let session_hours = parse_or("INKPRESS_SESSION_HOURS", &lookup, DEFAULT_SESSION_HOURS)?;
        let timeout_secs = parse_or(
            "INKPRESS_REQUEST_TIMEOUT_SECS",
            &lookup,
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        Ok(Config {
            database_url,
            api_key,
            bind,
            request_timeout: Duration::from_secs(timeout_secs),
            auth: AuthConfig {
                session_hours,
                ..AuthConfig::default()
            },
        })
    }
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
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
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_requires_database_url() {
        let result = Config::from_lookup(lookup_from(&[("INKPRESS_API_KEY", "anon")]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_requires_api_key() {
        let result = Config::from_lookup(lookup_from(&[("DATABASE_URL", "blog.db")]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("INKPRESS_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "blog.db"),
            ("INKPRESS_API_KEY", "  "),
        ]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("INKPRESS_API_KEY"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "blog.db"),
            ("INKPRESS_API_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(config.bind, DEFAULT_BIND.parse::<SocketAddr>().unwrap());
        assert_eq!(config.auth.session_hours, DEFAULT_SESSION_HOURS);
        assert_eq!(
            config.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_invalid_bind_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "blog.db"),
            ("INKPRESS_API_KEY", "anon"),
            ("INKPRESS_BIND", "not-an-address"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                name: "INKPRESS_BIND",
                ..
            })
        ));
    }

    #[test]
    fn test_overrides_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "blog.db"),
            ("INKPRESS_API_KEY", "anon"),
            ("INKPRESS_BIND", "127.0.0.1:8080"),
            ("INKPRESS_SESSION_HOURS", "24"),
            ("INKPRESS_REQUEST_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.auth.session_hours, 24);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
