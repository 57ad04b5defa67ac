use std::fmt;

/// Content type attached to a published configuration.
///
/// Rules are always published as [`ConfigType::Json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigType {
    /// JSON document
    Json,
}

impl ConfigType {
    /// The value Nacos expects in the `type` form field.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nacos error enum
#[derive(Debug, thiserror::Error)]
pub enum NacosError {
    /// Caller supplied an argument that cannot be used
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Config service answered a publish with `false`
    #[error("Failed to publish rules to Nacos, check the Nacos server logs for details")]
    PublishFailed,
    /// Config service answered with an error status
    #[error("Nacos responded with status {status}: {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
    /// Request never produced a response
    #[error("Nacos request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Rule payload could not be encoded or decoded
    #[error("Failed to convert rules: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Failed to initialize the Nacos client
    #[error("Failed to initialize Nacos client: {0}")]
    ClientInit(String),
    /// Properties document could not be read
    #[error("Invalid Nacos properties: {0}")]
    Config(String),
}
