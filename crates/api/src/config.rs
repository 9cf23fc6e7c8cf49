//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::InventorySettings;

/// Process configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `ENV` — deployment environment, prefixes the event source (default: `"dev"`)
/// - `EVENT_BUS_NAME` — bus outbound events are published to (default: `"default"`)
/// - `ORDER_CACHE_TTL_SECONDS` — lifetime of cached orders (default: `3600`)
/// - `MAX_WRITE_ATTEMPTS` — conditional write attempts per operation (default: `3`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub env: String,
    pub event_bus_name: String,
    pub order_cache_ttl_seconds: u64,
    pub max_write_attempts: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`. Unset or unparsable values
    /// fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            env: lookup("ENV").unwrap_or(defaults.env),
            event_bus_name: lookup("EVENT_BUS_NAME").unwrap_or(defaults.event_bus_name),
            order_cache_ttl_seconds: lookup("ORDER_CACHE_TTL_SECONDS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.order_cache_ttl_seconds),
            max_write_attempts: lookup("MAX_WRITE_ATTEMPTS")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_write_attempts),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Service tunables derived from this configuration.
    pub fn inventory_settings(&self) -> InventorySettings {
        InventorySettings {
            max_write_attempts: self.max_write_attempts,
            order_cache_ttl: Duration::from_secs(self.order_cache_ttl_seconds),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            env: "dev".to_string(),
            event_bus_name: "default".to_string(),
            order_cache_ttl_seconds: 3600,
            max_write_attempts: 3,
        }
    }
}
