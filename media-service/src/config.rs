//! Configuration for the media service
//!
//! Controls service identity, the seeded elements and the simulated
//! playback clock.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Configuration for a [`MediaService`](crate::MediaService)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Service name, first segment of every element uri
    /// Default: "Media"
    pub service_name: String,

    /// Fixed service id; generated at startup when absent
    /// Default: None
    pub service_id: Option<String>,

    /// Name of the seeded renderer
    /// Default: "Netflux"
    pub renderer_name: String,

    /// Name of the seeded collection
    /// Default: "default"
    pub default_collection_name: String,

    /// Playback clock period; also the offset increment per tick
    /// Default: 1000 ms
    #[serde(rename = "tickIntervalMs", with = "duration_ms")]
    pub tick_interval: Duration,

    /// Publish element updates whose `propertiesChanged` is empty
    /// Default: true
    pub emit_empty_updates: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "Media".to_string(),
            service_id: None,
            renderer_name: "Netflux".to_string(),
            default_collection_name: "default".to_string(),
            tick_interval: Duration::from_millis(1000),
            emit_empty_updates: true,
        }
    }
}

impl ServiceConfig {
    /// Create a ServiceConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ServiceConfig with a fast playback clock (100 ms ticks)
    pub fn fast_ticks() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            ..Default::default()
        }
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_service_id(mut self, id: impl Into<String>) -> Self {
        self.service_id = Some(id.into());
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_emit_empty_updates(mut self, emit: bool) -> Self {
        self.emit_empty_updates = emit;
        self
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by environment variables
    ///
    /// - `MEDIA_SERVICE_NAME`
    /// - `MEDIA_SERVICE_ID`
    /// - `MEDIA_TICK_INTERVAL_MS`
    /// - `MEDIA_EMIT_EMPTY_UPDATES` (true/false/1/0)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("MEDIA_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Some(id) = lookup("MEDIA_SERVICE_ID") {
            config.service_id = Some(id);
        }
        if let Some(raw) = lookup("MEDIA_TICK_INTERVAL_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                ServiceError::Config(format!("MEDIA_TICK_INTERVAL_MS={} is not a number", raw))
            })?;
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("MEDIA_EMIT_EMPTY_UPDATES") {
            config.emit_empty_updates = match raw.trim() {
                "true" | "1" => true,
                "false" | "0" => false,
                other => {
                    return Err(ServiceError::Config(format!(
                        "MEDIA_EMIT_EMPTY_UPDATES={} is not a boolean",
                        other
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.service_name.is_empty() {
            return Err(ServiceError::Config("service name must not be empty".into()));
        }
        if self.tick_interval < Duration::from_millis(1) {
            return Err(ServiceError::Config("tick interval must be at least 1 ms".into()));
        }
        if self.tick_interval.subsec_nanos() % 1_000_000 != 0 {
            return Err(ServiceError::Config(format!(
                "tick interval must be a whole number of milliseconds, got {:?}",
                self.tick_interval
            )));
        }
        Ok(())
    }

    /// Offset increment applied on every playback tick, in milliseconds
    pub fn tick_millis(&self) -> u64 {
        u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
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
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.service_name, "Media");
        assert_eq!(config.renderer_name, "Netflux");
        assert_eq!(config.default_collection_name, "default");
        assert_eq!(config.tick_millis(), 1000);
        assert!(config.emit_empty_updates);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fast_ticks_preset() {
        assert_eq!(ServiceConfig::fast_ticks().tick_millis(), 100);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("MEDIA_SERVICE_NAME", "Radio"),
            ("MEDIA_SERVICE_ID", "svc-1"),
            ("MEDIA_TICK_INTERVAL_MS", "250"),
            ("MEDIA_EMIT_EMPTY_UPDATES", "false"),
        ]))
        .unwrap();

        assert_eq!(config.service_name, "Radio");
        assert_eq!(config.service_id.as_deref(), Some("svc-1"));
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert!(!config.emit_empty_updates);
    }

    #[test]
    fn test_from_lookup_rejects_malformed_values() {
        let result = ServiceConfig::from_lookup(lookup_from(&[("MEDIA_TICK_INTERVAL_MS", "soon")]));
        assert!(matches!(result, Err(ServiceError::Config(_))));

        let result = ServiceConfig::from_lookup(lookup_from(&[("MEDIA_EMIT_EMPTY_UPDATES", "maybe")]));
        assert!(matches!(result, Err(ServiceError::Config(_))));

        let result = ServiceConfig::from_lookup(lookup_from(&[("MEDIA_TICK_INTERVAL_MS", "0")]));
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }

    #[test]
    fn test_from_json_partial() {
        let config = ServiceConfig::from_json(r#"{"serviceName":"Tv","tickIntervalMs":500}"#).unwrap();
        assert_eq!(config.service_name, "Tv");
        assert_eq!(config.tick_interval, Duration::from_millis(500));
        assert_eq!(config.renderer_name, "Netflux");
    }

    #[test]
    fn test_from_json_rejects_empty_name() {
        let result = ServiceConfig::from_json(r#"{"serviceName":""}"#);
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_sub_millisecond_intervals() {
        for interval in [
            Duration::ZERO,
            Duration::from_micros(1),
            Duration::from_micros(500),
            Duration::from_micros(1500),
        ] {
            let config = ServiceConfig::new().with_tick_interval(interval);
            assert!(
                matches!(config.validate(), Err(ServiceError::Config(_))),
                "{:?} should be rejected",
                interval
            );
        }

        let config = ServiceConfig::new().with_tick_interval(Duration::from_millis(1));
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_millis(), 1);
    }

    #[test]
    fn test_builder_methods() {
        let config = ServiceConfig::new()
            .with_service_name("Hifi")
            .with_service_id("fixed")
            .with_tick_interval(Duration::from_millis(10))
            .with_emit_empty_updates(false);

        assert_eq!(config.service_name, "Hifi");
        assert_eq!(config.service_id.as_deref(), Some("fixed"));
        assert_eq!(config.tick_millis(), 10);
        assert!(!config.emit_empty_updates);
    }
}
