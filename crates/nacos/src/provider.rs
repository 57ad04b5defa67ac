//! Read path: load an application's rules from Nacos.

use crate::{
    client::ConfigService,
    converter::{Converter, RuleDecoder},
    handler::DynamicRuleProvider,
    properties::NacosSentinelProperties,
    rule::{rule_data_id, RuleEntity},
    types::NacosError,
};
use async_trait::async_trait;
use std::{fmt, marker::PhantomData, sync::Arc};
use tracing::debug;

/// Loads `T` rules of an application from the Nacos config service.
pub struct RuleNacosProvider<T, S: ?Sized, D = RuleDecoder<T>> {
    config_service: Arc<S>,
    properties: Arc<NacosSentinelProperties>,
    converter: D,
    _rule: PhantomData<fn() -> T>,
}

impl<T, S> RuleNacosProvider<T, S>
where
    T: RuleEntity,
    S: ConfigService + ?Sized,
{
    /// Provider decoding with the default JSON decoder.
    pub fn new(config_service: Arc<S>, properties: Arc<NacosSentinelProperties>) -> Self {
        Self::with_converter(config_service, properties, RuleDecoder::new())
    }
}

impl<T, S, D> RuleNacosProvider<T, S, D>
where
    T: RuleEntity,
    S: ConfigService + ?Sized,
    D: Converter<str, Vec<T>>,
{
    /// Provider decoding with `converter`.
    pub fn with_converter(
        config_service: Arc<S>,
        properties: Arc<NacosSentinelProperties>,
        converter: D,
    ) -> Self {
        Self { config_service, properties, converter, _rule: PhantomData }
    }

    /// Data id the rules of `app` are stored under.
    pub fn data_id(&self, app: &str) -> String {
        rule_data_id(app, T::KIND)
    }
}

impl<T, S: ?Sized, D> fmt::Debug for RuleNacosProvider<T, S, D>
where
    T: RuleEntity,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleNacosProvider")
            .field("kind", &T::KIND)
            .field("group", &self.properties.group)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, S, D> DynamicRuleProvider<T> for RuleNacosProvider<T, S, D>
where
    T: RuleEntity,
    S: ConfigService + ?Sized,
    D: Converter<str, Vec<T>>,
{
    async fn get_rules(&self, app: &str) -> Result<Vec<T>, NacosError> {
        let data_id = self.data_id(app);
        let content = self
            .config_service
            .get_config(&data_id, &self.properties.group, self.properties.timeout)
            .await?;

        match content.filter(|content| !content.is_empty()) {
            Some(content) => self.converter.convert(content.as_str()),
            None => {
                debug!(target: "sentinel::nacos", data_id = %data_id, "[Nacos] No rules stored");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rule::{DegradeRuleEntity, FlowRuleEntity, RuleKind},
        test_utils::MockConfigService,
    };
    use assert_matches::assert_matches;

    fn provider(
        service: &Arc<MockConfigService>,
    ) -> RuleNacosProvider<FlowRuleEntity, MockConfigService> {
        RuleNacosProvider::new(service.clone(), Arc::new(NacosSentinelProperties::default()))
    }

    #[tokio::test]
    async fn test_missing_rules_are_empty() {
        let service = Arc::new(MockConfigService::default());
        let rules = provider(&service).get_rules("orders").await.unwrap();
        assert!(rules.is_empty());
        assert_eq!(service.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_content_is_empty() {
        let service = Arc::new(MockConfigService::default());
        service.insert("orders-flow-rules", "SENTINEL_GROUP", "");
        assert!(provider(&service).get_rules("orders").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_lower_cased_data_id_in_group() {
        let service = Arc::new(MockConfigService::default());
        service.insert(
            "orders-flow-rules",
            "SENTINEL_GROUP",
            r#"[{"resource": "/checkout", "count": 5.0}]"#,
        );

        let rules = provider(&service).get_rules("Orders").await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].resource.as_deref(), Some("/checkout"));
        assert_eq!(
            service.last_get(),
            Some(("orders-flow-rules".to_string(), "SENTINEL_GROUP".to_string(), 3000))
        );
    }

    #[tokio::test]
    async fn test_uses_configured_group_and_timeout() {
        let service = Arc::new(MockConfigService::default());
        let properties = NacosSentinelProperties {
            group: "RULES".to_string(),
            timeout: 500,
            ..Default::default()
        };
        let provider: RuleNacosProvider<DegradeRuleEntity, _> =
            RuleNacosProvider::new(service.clone(), Arc::new(properties));

        provider.get_rules("orders").await.unwrap();
        assert_eq!(
            service.last_get(),
            Some(("orders-degrade-rules".to_string(), "RULES".to_string(), 500))
        );
    }

    #[tokio::test]
    async fn test_remote_error_propagates() {
        let service = Arc::new(MockConfigService::default());
        service.fail_get_with(503);
        let err = provider(&service).get_rules("orders").await.unwrap_err();
        assert_matches!(err, NacosError::Remote { status: 503, .. });
    }

    #[tokio::test]
    async fn test_malformed_content_is_serialization_error() {
        let service = Arc::new(MockConfigService::default());
        service.insert("orders-flow-rules", "SENTINEL_GROUP", "not json");
        let err = provider(&service).get_rules("orders").await.unwrap_err();
        assert_matches!(err, NacosError::Serialization(_));
    }

    #[test]
    fn test_data_id() {
        let service = Arc::new(MockConfigService::default());
        let provider = provider(&service);
        assert_eq!(provider.data_id("MyApp"), provider.data_id("myapp"));
        assert_eq!(provider.data_id("MyApp"), format!("myapp{}", RuleKind::Flow.data_id_postfix()));
    }
}
