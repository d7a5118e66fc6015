//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use promoflow_infra::ServicesConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("{0} must be set when USE_PERSISTENT_STORES is enabled")]
    Missing(&'static str),
}

/// Where state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres {
        url: String,
        max_connections: u32,
        acquire_timeout: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub services: ServicesConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = parse_or("BIND_ADDR", var("BIND_ADDR"), DEFAULT_BIND_ADDR.parse().ok())?;

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });
        let ttl_minutes: i64 = parse_or("TOKEN_TTL_MINUTES", var("TOKEN_TTL_MINUTES"), Some(60))?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_MINUTES",
                reason: "must be positive".to_string(),
            });
        }
        let token_ttl = chrono::Duration::try_minutes(ttl_minutes)
            .filter(|ttl| chrono::Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| ConfigError::Invalid {
                name: "TOKEN_TTL_MINUTES",
                reason: format!("{ttl_minutes} minutes is out of range"),
            })?;
        let defaults = ServicesConfig::default();
        let services = ServicesConfig {
            jwt_secret,
            token_ttl,
            default_role_name: var("DEFAULT_ROLE_NAME").unwrap_or(defaults.default_role_name),
        };

        let persistent: bool = parse_or("USE_PERSISTENT_STORES", var("USE_PERSISTENT_STORES"), Some(false))?;
        let store = if persistent {
            StoreConfig::Postgres {
                url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                max_connections: parse_or("DB_MAX_CONNECTIONS", var("DB_MAX_CONNECTIONS"), Some(10))?,
                acquire_timeout: Duration::from_secs(parse_or(
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    var("DB_ACQUIRE_TIMEOUT_SECS"),
                    Some(5),
                )?),
            }
        } else {
            StoreConfig::InMemory
        };

        Ok(Self {
            bind_addr,
            services,
            store,
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => default.ok_or(ConfigError::Missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_to_in_memory_on_port_8080() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.store, StoreConfig::InMemory);
        assert_eq!(cfg.services.jwt_secret, "dev-secret");
        assert_eq!(cfg.services.token_ttl, chrono::Duration::minutes(60));
        assert_eq!(cfg.services.default_role_name, "customer");
    }

    #[test]
    fn persistent_store_requires_database_url() {
        let err = config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn persistent_store_reads_pool_settings() {
        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/promoflow"),
            ("DB_MAX_CONNECTIONS", "3"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "2"),
        ])
        .unwrap();
        assert_eq!(
            cfg.store,
            StoreConfig::Postgres {
                url: "postgres://localhost/promoflow".to_string(),
                max_connections: 3,
                acquire_timeout: Duration::from_secs(2),
            }
        );
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            config(&[("TOKEN_TTL_MINUTES", "soon")]),
            Err(ConfigError::Invalid { name: "TOKEN_TTL_MINUTES", .. })
        ));
        assert!(matches!(
            config(&[("TOKEN_TTL_MINUTES", "0")]),
            Err(ConfigError::Invalid { name: "TOKEN_TTL_MINUTES", .. })
        ));
        assert!(matches!(
            config(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { name: "BIND_ADDR", .. })
        ));
    }

    #[test]
    fn oversized_token_ttl_is_an_error() {
        for minutes in ["9223372036854775807", "153722867280912", "1000000000000"] {
            assert!(
                matches!(
                    config(&[("TOKEN_TTL_MINUTES", minutes)]),
                    Err(ConfigError::Invalid { name: "TOKEN_TTL_MINUTES", .. })
                ),
                "{minutes} accepted"
            );
        }
        let cfg = config(&[("TOKEN_TTL_MINUTES", "525600")]).unwrap();
        assert_eq!(cfg.services.token_ttl, chrono::Duration::days(365));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config(&[("JWT_SECRET", "  "), ("DEFAULT_ROLE_NAME", "")]).unwrap();
        assert_eq!(cfg.services.jwt_secret, "dev-secret");
        assert_eq!(cfg.services.default_role_name, "customer");
    }
}
