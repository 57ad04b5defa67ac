//! Sentinel dashboard rule synchronization backed by the Nacos config service.
//!
//! Rules of each kind are stored as a JSON array under the data id
//! `lowercase(app) + kind postfix` in the configured group.

pub mod client;
pub mod converter;
pub mod handler;
pub mod properties;
pub mod provider;
pub mod publisher;
pub mod rule;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::{ConfigService, NacosConfigClient};
pub use converter::{Converter, RuleDecoder, RuleEncoder};
pub use handler::{DynamicRuleProvider, DynamicRulePublisher};
pub use properties::{ConfigServiceProperties, NacosSentinelProperties};
pub use provider::RuleNacosProvider;
pub use publisher::RuleNacosPublisher;
pub use rule::{
    AuthorityRuleEntity, DegradeRuleEntity, FlowRuleEntity, ParamFlowRuleEntity, RuleEntity,
    RuleKind, SystemRuleEntity,
};
pub use store::NacosRuleStore;
pub use types::{ConfigType, NacosError};
