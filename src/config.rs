use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Application Configuration
// ============================================================================
//
// Read once at startup from the process environment. A `.env` file in the
// working directory is loaded first when present.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub kafka_brokers: String,
    pub orders_command_topic: String,
    pub catalog_request_topic: String,
    pub catalog_reply_topic: String,
    pub kafka_group_id: String,
    pub catalog_timeout: Duration,
    pub metrics_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env"),
        }

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let store = match lookup("ORDER_STORE").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres {
                database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "ORDER_STORE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            store,
            kafka_brokers: text("KAFKA_BROKERS", "127.0.0.1:9092"),
            orders_command_topic: text("ORDERS_COMMAND_TOPIC", "orders.commands"),
            catalog_request_topic: text("CATALOG_REQUEST_TOPIC", "products.commands"),
            catalog_reply_topic: text("CATALOG_REPLY_TOPIC", "orders.catalog-replies"),
            kafka_group_id: text("KAFKA_GROUP_ID", "orders-ms"),
            catalog_timeout: Duration::from_millis(parsed(&lookup, "CATALOG_TIMEOUT_MS", 5000)?),
            metrics_port: parsed(&lookup, "METRICS_PORT", 9090)?,
        })
    }
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/orders")]))
                .unwrap();

        assert_eq!(
            config.store,
            StoreBackend::Postgres {
                database_url: "postgres://localhost/orders".to_string(),
                max_connections: 5,
            }
        );
        assert_eq!(config.kafka_brokers, "127.0.0.1:9092");
        assert_eq!(config.orders_command_topic, "orders.commands");
        assert_eq!(config.catalog_request_topic, "products.commands");
        assert_eq!(config.catalog_reply_topic, "orders.catalog-replies");
        assert_eq!(config.kafka_group_id, "orders-ms");
        assert_eq!(config.catalog_timeout, Duration::from_secs(5));
        assert_eq!(config.metrics_port, 9090);
    }

    #[test]
    fn test_database_url_required_for_postgres() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_memory_store_needs_no_database() {
        let config = AppConfig::from_lookup(lookup(&[("ORDER_STORE", "memory")])).unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("ORDER_STORE", "memory"),
            ("KAFKA_BROKERS", "redpanda:29092"),
            ("CATALOG_TIMEOUT_MS", "250"),
            ("METRICS_PORT", "9100"),
        ]))
        .unwrap();

        assert_eq!(config.kafka_brokers, "redpanda:29092");
        assert_eq!(config.catalog_timeout, Duration::from_millis(250));
        assert_eq!(config.metrics_port, 9100);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("ORDER_STORE", "memory"),
            ("METRICS_PORT", "ninety"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "METRICS_PORT",
                value: "ninety".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_store_backend() {
        let err = AppConfig::from_lookup(lookup(&[("ORDER_STORE", "redis")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ORDER_STORE", .. }));
    }
}
