//! Runtime configuration read from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} is required: {reason}")]
    Missing { field: &'static str, reason: &'static str },

    #[error("invalid value '{value}' for {field}: {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Where users, items and catalogs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    Postgres { database_url: String },
}

/// Argon2 cost knobs; `None` keeps the library defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordCost {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub session_ttl: chrono::Duration,
    /// Adds `Secure` to the session cookie.
    pub cookie_secure: bool,
    pub storage: StorageBackend,
    pub password_cost: PasswordCost,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                field: "BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            }
        })?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let ttl_hours = match get("SESSION_TTL_HOURS") {
            Some(raw) => parse_positive::<i64>("SESSION_TTL_HOURS", &raw)?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        let cookie_secure = match get("COOKIE_SECURE") {
            Some(raw) => parse_bool("COOKIE_SECURE", &raw)?,
            None => false,
        };

        let persistent = match get("USE_PERSISTENT_STORES") {
            Some(raw) => parse_bool("USE_PERSISTENT_STORES", &raw)?,
            None => false,
        };
        let storage = if persistent {
            let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing {
                field: "DATABASE_URL",
                reason: "USE_PERSISTENT_STORES is enabled",
            })?;
            StorageBackend::Postgres { database_url }
        } else {
            StorageBackend::InMemory
        };

        let password_cost = PasswordCost {
            memory_kib: get("ARGON2_MEMORY_KIB")
                .map(|raw| parse_positive::<u32>("ARGON2_MEMORY_KIB", &raw))
                .transpose()?,
            iterations: get("ARGON2_ITERATIONS")
                .map(|raw| parse_positive::<u32>("ARGON2_ITERATIONS", &raw))
                .transpose()?,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            session_ttl: chrono::Duration::hours(ttl_hours),
            cookie_secure,
            storage,
            password_cost,
        })
    }

    /// In-memory configuration with cheap password hashing, for tests.
    pub fn for_tests(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            session_ttl: chrono::Duration::hours(1),
            cookie_secure: false,
            storage: StorageBackend::InMemory,
            password_cost: PasswordCost {
                memory_kib: Some(8),
                iterations: Some(1),
            },
        }
    }
}

fn parse_bool(field: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            field,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_positive<T>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr + PartialOrd + Default,
    T::Err: core::fmt::Display,
{
    let invalid = |reason: String| ConfigError::Invalid {
        field,
        value: raw.to_string(),
        reason,
    };
    let value: T = raw.trim().parse().map_err(|e: T::Err| invalid(e.to_string()))?;
    if value <= T::default() {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.session_ttl, chrono::Duration::days(7));
        assert!(!cfg.cookie_secure);
        assert_eq!(cfg.storage, StorageBackend::InMemory);
        assert_eq!(cfg.password_cost, PasswordCost::default());
    }

    #[test]
    fn persistent_stores_require_database_url() {
        assert!(matches!(
            config(&[("USE_PERSISTENT_STORES", "true")]),
            Err(ConfigError::Missing { field: "DATABASE_URL", .. })
        ));

        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "1"),
            ("DATABASE_URL", "postgres://localhost/stockroom"),
        ])
        .unwrap();
        assert_eq!(
            cfg.storage,
            StorageBackend::Postgres {
                database_url: "postgres://localhost/stockroom".to_string()
            }
        );
    }

    #[test]
    fn rejects_malformed_values() {
        for (key, value) in [
            ("BIND_ADDR", "not-an-addr"),
            ("SESSION_TTL_HOURS", "0"),
            ("SESSION_TTL_HOURS", "soon"),
            ("COOKIE_SECURE", "maybe"),
            ("ARGON2_ITERATIONS", "-3"),
        ] {
            assert!(
                matches!(config(&[(key, value)]), Err(ConfigError::Invalid { .. })),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("JWT_SECRET", "s3cret"),
            ("SESSION_TTL_HOURS", "12"),
            ("COOKIE_SECURE", "true"),
            ("ARGON2_MEMORY_KIB", "1024"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.session_ttl, chrono::Duration::hours(12));
        assert!(cfg.cookie_secure);
        assert_eq!(cfg.password_cost.memory_kib, Some(1024));
        assert_eq!(cfg.password_cost.iterations, None);
    }
}
