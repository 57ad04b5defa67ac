//! Wiring of providers and publishers around one config service.

use crate::{
    client::{ConfigService, NacosConfigClient},
    properties::NacosSentinelProperties,
    provider::RuleNacosProvider,
    publisher::RuleNacosPublisher,
    rule::RuleEntity,
    types::NacosError,
};
use std::sync::Arc;
use tracing::info;

/// Hands out rule providers and publishers sharing one config service and
/// one set of properties.
#[derive(Debug)]
pub struct NacosRuleStore<S: ?Sized> {
    config_service: Arc<S>,
    properties: Arc<NacosSentinelProperties>,
}

impl<S: ?Sized> Clone for NacosRuleStore<S> {
    fn clone(&self) -> Self {
        Self { config_service: self.config_service.clone(), properties: self.properties.clone() }
    }
}

impl NacosRuleStore<NacosConfigClient> {
    /// Build the Nacos client from `properties` and wrap it.
    pub fn connect(properties: NacosSentinelProperties) -> Result<Self, NacosError> {
        let client =
            NacosConfigClient::from_properties(&properties.assemble_config_service_properties())?;
        info!(target: "sentinel::nacos", "[Nacos] Rule store ready, group {}", properties.group);
        Ok(Self::new(Arc::new(client), Arc::new(properties)))
    }
}

impl<S: ConfigService + ?Sized> NacosRuleStore<S> {
    /// Wrap an existing config service.
    pub const fn new(config_service: Arc<S>, properties: Arc<NacosSentinelProperties>) -> Self {
        Self { config_service, properties }
    }

    /// The properties this store was built with.
    pub fn properties(&self) -> &NacosSentinelProperties {
        &self.properties
    }

    /// The shared config service.
    pub const fn config_service(&self) -> &Arc<S> {
        &self.config_service
    }

    /// Provider for `T` rules using the default decoder.
    pub fn provider<T: RuleEntity>(&self) -> RuleNacosProvider<T, S> {
        RuleNacosProvider::new(self.config_service.clone(), self.properties.clone())
    }

    /// Publisher for `T` rules using the default encoder.
    pub fn publisher<T: RuleEntity>(&self) -> RuleNacosPublisher<T, S> {
        RuleNacosPublisher::new(self.config_service.clone(), self.properties.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handler::{DynamicRuleProvider, DynamicRulePublisher},
        rule::{DegradeRuleEntity, FlowRuleEntity, SystemRuleEntity},
        test_utils::MockConfigService,
    };
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_rule_kinds_do_not_collide() {
        let service = Arc::new(MockConfigService::default());
        let store = NacosRuleStore::new(service.clone(), Arc::new(Default::default()));

        let flow = vec![FlowRuleEntity { resource: Some("/a".to_string()), ..Default::default() }];
        let system = vec![SystemRuleEntity { qps: Some(100.0), ..Default::default() }];
        store.publisher::<FlowRuleEntity>().publish("app", Some(flow.as_slice())).await.unwrap();
        store.publisher::<SystemRuleEntity>().publish("app", Some(system.as_slice())).await.unwrap();

        assert_eq!(store.provider::<FlowRuleEntity>().get_rules("APP").await.unwrap(), flow);
        assert_eq!(store.provider::<SystemRuleEntity>().get_rules("app").await.unwrap(), system);
        assert!(store.provider::<DegradeRuleEntity>().get_rules("app").await.unwrap().is_empty());
        assert_eq!(service.publish_calls(), 2);
    }

    #[test]
    fn test_connect_requires_server_addr() {
        let err = NacosRuleStore::connect(NacosSentinelProperties::default()).unwrap_err();
        assert_matches!(err, NacosError::ClientInit(_));
    }

    #[test]
    fn test_connect() {
        let properties = NacosSentinelProperties {
            server_addr: Some("127.0.0.1:8848".to_string()),
            group: "RULES".to_string(),
            ..Default::default()
        };
        let store = NacosRuleStore::connect(properties).unwrap();
        assert_eq!(store.properties().group, "RULES");
    }
}
