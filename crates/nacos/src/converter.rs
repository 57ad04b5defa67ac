//! JSON converters between rule lists and Nacos config content.

use crate::{
    rule::{JsonFormat, RuleEntity},
    types::NacosError,
};
use std::{fmt, marker::PhantomData};

/// Converts a source value into a target value.
pub trait Converter<S: ?Sized, T>: Send + Sync {
    /// Convert `source`.
    fn convert(&self, source: &S) -> Result<T, NacosError>;
}

/// Encodes a rule list into the config content published to Nacos.
pub struct RuleEncoder<T> {
    format: JsonFormat,
    _rule: PhantomData<fn(&T)>,
}

impl<T: RuleEntity> RuleEncoder<T> {
    /// Encoder using the layout the dashboard uses for `T`.
    pub const fn new() -> Self {
        Self::with_format(T::KIND.json_format())
    }
}

impl<T> RuleEncoder<T> {
    /// Encoder using an explicit layout.
    pub const fn with_format(format: JsonFormat) -> Self {
        Self { format, _rule: PhantomData }
    }

    /// The layout this encoder produces.
    pub const fn format(&self) -> JsonFormat {
        self.format
    }
}

impl<T: RuleEntity> Default for RuleEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RuleEncoder<T> {
    fn clone(&self) -> Self {
        Self::with_format(self.format)
    }
}

impl<T> fmt::Debug for RuleEncoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEncoder").field("format", &self.format).finish()
    }
}

impl<T: RuleEntity> Converter<[T], String> for RuleEncoder<T> {
    fn convert(&self, rules: &[T]) -> Result<String, NacosError> {
        let content = match self.format {
            JsonFormat::Pretty => serde_json::to_string_pretty(rules)?,
            JsonFormat::Compact => serde_json::to_string(rules)?,
        };
        Ok(content)
    }
}

/// Decodes Nacos config content into a rule list.
pub struct RuleDecoder<T> {
    _rule: PhantomData<fn() -> T>,
}

impl<T> RuleDecoder<T> {
    /// Create a decoder.
    pub const fn new() -> Self {
        Self { _rule: PhantomData }
    }
}

impl<T> Default for RuleDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RuleDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RuleDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDecoder").finish()
    }
}

impl<T: RuleEntity> Converter<str, Vec<T>> for RuleDecoder<T> {
    fn convert(&self, content: &str) -> Result<Vec<T>, NacosError> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        // `null` is what an encoded absent list looks like
        let rules: Option<Vec<T>> = serde_json::from_str(content)?;
        Ok(rules.unwrap_or_default())
    }
}
