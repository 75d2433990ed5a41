//! Process configuration read from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

use stockroom_infra::harness::DEFAULT_MAX_WORKERS;

pub const BIND_ADDR_ENV: &str = "STOCKROOM_BIND_ADDR";
pub const MAX_WORKERS_ENV: &str = "STOCKROOM_MAX_SIMULATION_WORKERS";
pub const SEED_ON_STARTUP_ENV: &str = "STOCKROOM_SEED_ON_STARTUP";
pub const USE_PERSISTENT_STORES_ENV: &str = "USE_PERSISTENT_STORES";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Where items and audit entries live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub max_simulation_workers: usize,
    pub seed_on_startup: bool,
    pub persistence: Persistence,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            key: BIND_ADDR_ENV,
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let max_simulation_workers = match lookup(MAX_WORKERS_ENV) {
            None => DEFAULT_MAX_WORKERS,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        key: MAX_WORKERS_ENV,
                        value: raw,
                        reason: "must be at least 1".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        key: MAX_WORKERS_ENV,
                        value: raw,
                        reason: e.to_string(),
                    });
                }
            },
        };

        let seed_on_startup = parse_bool(SEED_ON_STARTUP_ENV, lookup(SEED_ON_STARTUP_ENV), true)?;

        let persistence = if parse_bool(
            USE_PERSISTENT_STORES_ENV,
            lookup(USE_PERSISTENT_STORES_ENV),
            false,
        )? {
            let database_url = lookup(DATABASE_URL_ENV)
                .filter(|url| !url.trim().is_empty())
                .ok_or(ConfigError::Missing(DATABASE_URL_ENV))?;
            Persistence::Postgres { database_url }
        } else {
            Persistence::InMemory
        };

        Ok(Self {
            bind_addr,
            max_simulation_workers,
            seed_on_startup,
            persistence,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_simulation_workers: DEFAULT_MAX_WORKERS,
            seed_on_startup: true,
            persistence: Persistence::InMemory,
        }
    }
}

fn parse_bool(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(cfg.max_simulation_workers, 20);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            (BIND_ADDR_ENV, "127.0.0.1:9000"),
            (MAX_WORKERS_ENV, "4"),
            (SEED_ON_STARTUP_ENV, "false"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.max_simulation_workers, 4);
        assert!(!cfg.seed_on_startup);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = config(&[(MAX_WORKERS_ENV, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: MAX_WORKERS_ENV, .. }));
    }

    #[test]
    fn persistent_stores_require_database_url() {
        assert_eq!(
            config(&[(USE_PERSISTENT_STORES_ENV, "true")]).unwrap_err(),
            ConfigError::Missing(DATABASE_URL_ENV)
        );

        let cfg = config(&[
            (USE_PERSISTENT_STORES_ENV, "true"),
            (DATABASE_URL_ENV, "postgres://localhost/stockroom"),
        ])
        .unwrap();
        assert_eq!(
            cfg.persistence,
            Persistence::Postgres {
                database_url: "postgres://localhost/stockroom".to_string()
            }
        );
    }

    #[test]
    fn garbage_bool_is_rejected() {
        assert!(config(&[(SEED_ON_STARTUP_ENV, "maybe")]).is_err());
    }
}
