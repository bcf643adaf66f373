//! Configuration types and sources.

use std::collections::HashMap;

use crate::error::ConfigError;

/// Property key under which an endpoint configures a content-type override.
pub const CONTENT_TYPE_KEY: &str = "rabbitmq.message.content.type";

/// Content type used when neither the message nor the endpoint supplies one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bridge name for identification in logs.
    pub name: String,
    /// Content type assumed when a delivery carries none.
    pub default_content_type: String,
    /// Key looked up in the [`ConfigSource`] for the content-type override.
    pub content_type_key: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: "delivery-bridge".to_string(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            content_type_key: CONTENT_TYPE_KEY.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Build a configuration from environment variables, falling back to defaults.
    ///
    /// - `DELIVERY_BRIDGE_NAME`
    /// - `DELIVERY_BRIDGE_DEFAULT_CONTENT_TYPE`
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable lookup.
    /// Blank values count as unset.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_blank = |key: &str| var(key).filter(|s| !s.trim().is_empty());
        Self {
            name: non_blank("DELIVERY_BRIDGE_NAME").unwrap_or(defaults.name),
            default_content_type: non_blank("DELIVERY_BRIDGE_DEFAULT_CONTENT_TYPE")
                .unwrap_or(defaults.default_content_type),
            content_type_key: defaults.content_type_key,
        }
    }
}

/// Source of optional per-endpoint settings, consulted once per delivery.
pub trait ConfigSource: Send + Sync {
    /// Look up a value. `Ok(None)` means the key is simply not configured.
    fn lookup(&self, key: &str) -> Result<Option<String>, ConfigError>;
}

/// In-memory endpoint properties.
#[derive(Debug, Clone, Default)]
pub struct EndpointProperties {
    values: HashMap<String, String>,
}

impl EndpointProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for EndpointProperties {
    fn lookup(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }
}

/// Environment-backed source. Keys are upper-cased, non-alphanumerics become
/// `_`, and the prefix is prepended: `rabbitmq.message.content.type` with
/// prefix `BRIDGE_` reads `BRIDGE_RABBITMQ_MESSAGE_CONTENT_TYPE`.
#[derive(Debug, Clone)]
pub struct EnvConfigSource {
    prefix: String,
}

impl EnvConfigSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable name for a property key.
    pub fn var_name(&self, key: &str) -> String {
        let mapped: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", self.prefix, mapped)
    }
}

impl ConfigSource for EnvConfigSource {
    fn lookup(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match std::env::var(self.var_name(key)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode {
                key: key.to_string(),
            }),
        }
    }
}
