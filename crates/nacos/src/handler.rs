//! Rule handler interfaces for loading and publishing dashboard rules

use crate::types::NacosError;
use async_trait::async_trait;

/// Loads the rules of an application from a dynamic rule source.
#[async_trait]
pub trait DynamicRuleProvider<T>: Send + Sync {
    /// Fetch all rules of `app`. An application without rules yields an empty list.
    async fn get_rules(&self, app: &str) -> Result<Vec<T>, NacosError>;
}

/// Pushes the rules of an application to a dynamic rule source.
#[async_trait]
pub trait DynamicRulePublisher<T>: Send + Sync {
    /// Replace the rules of `app`. `None` publishes nothing.
    async fn publish(&self, app: &str, rules: Option<&[T]>) -> Result<(), NacosError>;
}
