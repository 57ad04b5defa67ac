//! Connection properties for the Nacos config service.
//!
//! [`NacosSentinelProperties`] is bound from the `spring.cloud.sentinel.nacos.config`
//! section of the dashboard configuration and assembled into the flat
//! [`ConfigServiceProperties`] map the config client is built from.

use crate::types::NacosError;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value as YamlValue;
use std::{collections::BTreeMap, fmt, path::Path};
use tracing::{debug, info};

/// Configuration prefix the properties are bound from.
pub const PREFIX: &str = "spring.cloud.sentinel.nacos.config";

/// Nacos default namespace.
pub const DEFAULT_NAMESPACE: &str = "public";

/// Group the rules are stored under unless configured otherwise.
pub const DEFAULT_GROUP: &str = "SENTINEL_GROUP";

/// Read timeout in milliseconds unless configured otherwise.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Keys of the assembled config client property set.
pub mod property_key {
    /// Comma-separated server addresses
    pub const SERVER_ADDR: &str = "serverAddr";
    /// Authentication username
    pub const USERNAME: &str = "username";
    /// Authentication password
    pub const PASSWORD: &str = "password";
    /// Content charset
    pub const ENCODE: &str = "encode";
    /// Namespace (tenant) id
    pub const NAMESPACE: &str = "namespace";
    /// Namespace access key
    pub const ACCESS_KEY: &str = "accessKey";
    /// Namespace secret key
    pub const SECRET_KEY: &str = "secretKey";
    /// Cluster name
    pub const CLUSTER_NAME: &str = "clusterName";
    /// Tolerated server connection errors
    pub const MAX_RETRY: &str = "maxRetry";
    /// Long poll timeout
    pub const CONFIG_LONG_POLL_TIMEOUT: &str = "configLongPollTimeout";
    /// Delay between retries
    pub const CONFIG_RETRY_TIME: &str = "configRetryTime";
    /// Remote sync on first load
    pub const ENABLE_REMOTE_SYNC_CONFIG: &str = "enableRemoteSyncConfig";
}

/// Sentinel dashboard settings for the Nacos config service.
///
/// Unset optional fields assemble to empty strings, never to absent keys.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NacosSentinelProperties {
    /// Nacos config server address.
    #[serde(alias = "server-addr", deserialize_with = "lenient_string")]
    pub server_addr: Option<String>,
    /// The Nacos authentication username.
    #[serde(deserialize_with = "lenient_string")]
    pub username: Option<String>,
    /// The Nacos authentication password.
    #[serde(deserialize_with = "lenient_string")]
    pub password: Option<String>,
    /// Namespace, separates configuration of different environments.
    #[serde(deserialize_with = "lenient_string")]
    pub namespace: Option<String>,
    /// Nacos config group.
    pub group: String,
    /// Charset of the config content.
    #[serde(deserialize_with = "lenient_string")]
    pub encode: Option<String>,
    /// Read timeout in milliseconds.
    pub timeout: u64,
    /// Maximum number of tolerable server reconnection errors.
    #[serde(alias = "max-retry", deserialize_with = "lenient_string")]
    pub max_retry: Option<String>,
    /// Long poll timeout for config reads.
    #[serde(alias = "config-long-poll-timeout", deserialize_with = "lenient_string")]
    pub config_long_poll_timeout: Option<String>,
    /// Delay between failed attempts.
    #[serde(alias = "config-retry-time", deserialize_with = "lenient_string")]
    pub config_retry_time: Option<String>,
    /// Pull the config remotely on first load.
    #[serde(alias = "enable-remote-sync-config")]
    pub enable_remote_sync_config: bool,
    /// Access key for the namespace.
    #[serde(alias = "access-key", deserialize_with = "lenient_string")]
    pub access_key: Option<String>,
    /// Secret key for the namespace.
    #[serde(alias = "secret-key", deserialize_with = "lenient_string")]
    pub secret_key: Option<String>,
    /// Nacos config cluster name.
    #[serde(alias = "cluster-name", deserialize_with = "lenient_string")]
    pub cluster_name: Option<String>,
}

impl Default for NacosSentinelProperties {
    fn default() -> Self {
        Self {
            server_addr: None,
            username: None,
            password: None,
            namespace: None,
            group: DEFAULT_GROUP.to_string(),
            encode: None,
            timeout: DEFAULT_TIMEOUT_MS,
            max_retry: None,
            config_long_poll_timeout: None,
            config_retry_time: None,
            enable_remote_sync_config: false,
            access_key: None,
            secret_key: None,
            cluster_name: None,
        }
    }
}

impl fmt::Debug for NacosSentinelProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NacosSentinelProperties")
            .field("server_addr", &self.server_addr)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("namespace", &self.namespace)
            .field("group", &self.group)
            .field("encode", &self.encode)
            .field("timeout", &self.timeout)
            .field("max_retry", &self.max_retry)
            .field("config_long_poll_timeout", &self.config_long_poll_timeout)
            .field("config_retry_time", &self.config_retry_time)
            .field("enable_remote_sync_config", &self.enable_remote_sync_config)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("cluster_name", &self.cluster_name)
            .finish()
    }
}

impl NacosSentinelProperties {
    /// Bind the properties from a YAML document.
    ///
    /// The section is looked up under [`PREFIX`], either nested
    /// (`spring: cloud: ...`) or with dotted keys at any level. A document
    /// without the section yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, NacosError> {
        let document: YamlValue = serde_yaml::from_str(yaml)
            .map_err(|e| NacosError::Config(format!("Failed to parse YAML: {}", e)))?;

        match find_section(&document, PREFIX) {
            Some(section) => serde_yaml::from_value(section.clone()).map_err(|e| {
                NacosError::Config(format!("Failed to bind {}: {}", PREFIX, e))
            }),
            None => {
                debug!(target: "sentinel::nacos", "[Nacos] No {} section found, using defaults", PREFIX);
                Ok(Self::default())
            }
        }
    }

    /// Bind the properties from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, NacosError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            NacosError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Namespace as sent to Nacos.
    ///
    /// `public` maps to the empty string, see
    /// <https://github.com/alibaba/spring-cloud-alibaba/issues/2872>.
    pub fn resolve_namespace(&self) -> String {
        match self.namespace.as_deref() {
            Some(DEFAULT_NAMESPACE) => {
                info!(target: "sentinel::nacos", "[Nacos] Set config namespace 'public' to ''");
                String::new()
            }
            namespace => namespace.unwrap_or_default().to_string(),
        }
    }

    /// Assemble the property set the config client is built from.
    pub fn assemble_config_service_properties(&self) -> ConfigServiceProperties {
        fn or_empty(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }

        let mut properties = ConfigServiceProperties::default();
        properties.insert(property_key::SERVER_ADDR, or_empty(&self.server_addr));
        properties.insert(property_key::USERNAME, or_empty(&self.username));
        properties.insert(property_key::PASSWORD, or_empty(&self.password));
        properties.insert(property_key::ENCODE, or_empty(&self.encode));
        properties.insert(property_key::NAMESPACE, self.resolve_namespace());
        properties.insert(property_key::ACCESS_KEY, or_empty(&self.access_key));
        properties.insert(property_key::SECRET_KEY, or_empty(&self.secret_key));
        properties.insert(property_key::CLUSTER_NAME, or_empty(&self.cluster_name));
        properties.insert(property_key::MAX_RETRY, or_empty(&self.max_retry));
        properties
            .insert(property_key::CONFIG_LONG_POLL_TIMEOUT, or_empty(&self.config_long_poll_timeout));
        properties.insert(property_key::CONFIG_RETRY_TIME, or_empty(&self.config_retry_time));
        properties.insert(
            property_key::ENABLE_REMOTE_SYNC_CONFIG,
            self.enable_remote_sync_config.to_string(),
        );
        properties
    }
}

/// Flat key/value property set handed to the config client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigServiceProperties(BTreeMap<String, String>);

impl ConfigServiceProperties {
    /// Set a property, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Value of a property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value of a property, `None` when absent or empty.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Iterate over all properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Walk `path` through nested mappings, accepting dotted keys at any level.
fn find_section<'a>(value: &'a YamlValue, path: &str) -> Option<&'a YamlValue> {
    let YamlValue::Mapping(mapping) = value else {
        return None;
    };
    for (key, child) in mapping {
        let Some(key) = key.as_str() else {
            continue;
        };
        if key == path {
            return Some(child);
        }
        if let Some(rest) = path.strip_prefix(key).and_then(|rest| rest.strip_prefix('.')) {
            if let Some(found) = find_section(child, rest) {
                return Some(found);
            }
        }
    }
    None
}

/// Accept scalars of any type for string-typed settings, e.g. `max-retry: 3`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::String(v) => v,
        Scalar::Unsigned(v) => v.to_string(),
        Scalar::Signed(v) => v.to_string(),
        Scalar::Float(v) => v.to_string(),
        Scalar::Bool(v) => v.to_string(),
    }))
}
