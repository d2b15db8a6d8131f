//! Server configuration, read from `KILLROOM_*` environment variables.

use killroom_room::ServiceConfig;

pub const HTTP_ADDR_VAR: &str = "KILLROOM_HTTP_ADDR";
pub const EVENTS_ADDR_VAR: &str = "KILLROOM_EVENTS_ADDR";
pub const UTC_OFFSET_VAR: &str = "KILLROOM_UTC_OFFSET_HOURS";
pub const ID_ATTEMPTS_VAR: &str = "KILLROOM_ID_ATTEMPTS";

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_EVENTS_ADDR: &str = "127.0.0.1:8081";

/// A setting that could not be used.
#[derive(Debug, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: &'static str,
}

/// Everything needed to start a [`KillroomServer`](crate::KillroomServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address of the HTTP API.
    pub http_addr: String,
    /// Address of the WebSocket event channel.
    pub events_addr: String,
    pub service: ServiceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            events_addr: DEFAULT_EVENTS_ADDR.to_string(),
            service: ServiceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the process environment. Unset variables take defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup(HTTP_ADDR_VAR) {
            config.http_addr = addr;
        }
        if let Some(addr) = lookup(EVENTS_ADDR_VAR) {
            config.events_addr = addr;
        }

        if let Some(raw) = lookup(UTC_OFFSET_VAR) {
            let invalid = |reason| ConfigError {
                var: UTC_OFFSET_VAR,
                value: raw.clone(),
                reason,
            };
            let hours: i32 = raw
                .trim()
                .parse()
                .map_err(|_| invalid("expected whole hours"))?;
            config.service.kill_time_offset = ServiceConfig::offset_from_hours(hours)
                .ok_or_else(|| invalid("must be between -23 and 23"))?;
        }

        if let Some(raw) = lookup(ID_ATTEMPTS_VAR) {
            config.service.id_attempts = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError {
                        var: ID_ATTEMPTS_VAR,
                        value: raw,
                        reason: "expected a positive integer",
                    });
                }
            };
        }

        tracing::debug!(
            http = %config.http_addr,
            events = %config.events_addr,
            offset_secs = config.service.kill_time_offset.local_minus_utc(),
            id_attempts = config.service.id_attempts,
            "configuration loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.http_addr, "127.0.0.1:8080");
        assert_eq!(config.events_addr, "127.0.0.1:8081");
        assert_eq!(config.service.kill_time_offset.local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            (HTTP_ADDR_VAR, "0.0.0.0:9000"),
            (EVENTS_ADDR_VAR, "0.0.0.0:9001"),
            (UTC_OFFSET_VAR, "-3"),
            (ID_ATTEMPTS_VAR, "20"),
        ]))
        .unwrap();
        assert_eq!(config.http_addr, "0.0.0.0:9000");
        assert_eq!(config.events_addr, "0.0.0.0:9001");
        assert_eq!(config.service.kill_time_offset.local_minus_utc(), -3 * 3600);
        assert_eq!(config.service.id_attempts, 20);
    }

    #[test]
    fn test_bad_offset_is_rejected() {
        for raw in ["abc", "24", "1.5"] {
            let err = ServerConfig::from_lookup(lookup(&[(UTC_OFFSET_VAR, raw)])).unwrap_err();
            assert_eq!(err.var, UTC_OFFSET_VAR);
        }
    }

    #[test]
    fn test_bad_attempts_are_rejected() {
        for raw in ["0", "-1", "many"] {
            let err = ServerConfig::from_lookup(lookup(&[(ID_ATTEMPTS_VAR, raw)])).unwrap_err();
            assert_eq!(err.var, ID_ATTEMPTS_VAR);
            assert!(err.to_string().contains(raw));
        }
    }
}
