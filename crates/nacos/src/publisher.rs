//! Write path: publish an application's rules to Nacos.

use crate::{
    client::ConfigService,
    converter::{Converter, RuleEncoder},
    handler::DynamicRulePublisher,
    properties::NacosSentinelProperties,
    rule::{rule_data_id, RuleEntity},
    types::{ConfigType, NacosError},
};
use async_trait::async_trait;
use std::{fmt, marker::PhantomData, sync::Arc};
use tracing::{error, info};

/// Publishes `T` rules of an application to the Nacos config service.
///
/// Every publish overwrites the stored rules; concurrent publishers race and
/// the last write wins.
pub struct RuleNacosPublisher<T, S: ?Sized, E = RuleEncoder<T>> {
    config_service: Arc<S>,
    properties: Arc<NacosSentinelProperties>,
    converter: E,
    _rule: PhantomData<fn(&T)>,
}

impl<T, S> RuleNacosPublisher<T, S>
where
    T: RuleEntity,
    S: ConfigService + ?Sized,
{
    /// Publisher encoding with the default JSON encoder for `T`.
    pub fn new(config_service: Arc<S>, properties: Arc<NacosSentinelProperties>) -> Self {
        Self::with_converter(config_service, properties, RuleEncoder::new())
    }
}

impl<T, S, E> RuleNacosPublisher<T, S, E>
where
    T: RuleEntity,
    S: ConfigService + ?Sized,
    E: Converter<[T], String>,
{
    /// Publisher encoding with `converter`.
    pub fn with_converter(
        config_service: Arc<S>,
        properties: Arc<NacosSentinelProperties>,
        converter: E,
    ) -> Self {
        Self { config_service, properties, converter, _rule: PhantomData }
    }

    /// Data id the rules of `app` are stored under.
    pub fn data_id(&self, app: &str) -> String {
        rule_data_id(app, T::KIND)
    }
}

impl<T, S: ?Sized, E> fmt::Debug for RuleNacosPublisher<T, S, E>
where
    T: RuleEntity,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleNacosPublisher")
            .field("kind", &T::KIND)
            .field("group", &self.properties.group)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, S, E> DynamicRulePublisher<T> for RuleNacosPublisher<T, S, E>
where
    T: RuleEntity,
    S: ConfigService + ?Sized,
    E: Converter<[T], String>,
{
    async fn publish(&self, app: &str, rules: Option<&[T]>) -> Result<(), NacosError> {
        if app.is_empty() {
            return Err(NacosError::InvalidArgument("app name cannot be empty"));
        }
        let Some(rules) = rules else {
            return Ok(());
        };

        let data_id = self.data_id(app);
        let content = self.converter.convert(rules)?;
        let published = self
            .config_service
            .publish_config(&data_id, &self.properties.group, &content, ConfigType::Json)
            .await?;

        if !published {
            error!(target: "sentinel::nacos", data_id = %data_id, group = %self.properties.group, "[Nacos] Config service rejected rules");
            return Err(NacosError::PublishFailed);
        }
        info!(target: "sentinel::nacos", data_id = %data_id, count = rules.len(), "[Nacos] Rules published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rule::{AuthorityRule, AuthorityRuleEntity, FlowRuleEntity},
        test_utils::MockConfigService,
    };
    use assert_matches::assert_matches;

    fn publisher(
        service: &Arc<MockConfigService>,
    ) -> RuleNacosPublisher<FlowRuleEntity, MockConfigService> {
        RuleNacosPublisher::new(service.clone(), Arc::new(NacosSentinelProperties::default()))
    }

    fn rules() -> Vec<FlowRuleEntity> {
        vec![FlowRuleEntity {
            app: Some("orders".to_string()),
            resource: Some("/checkout".to_string()),
            count: Some(10.0),
            ..Default::default()
        }]
    }

    #[tokio::test]
    async fn test_empty_app_is_rejected_before_any_call() {
        let service = Arc::new(MockConfigService::default());
        let err = publisher(&service).publish("", Some(rules().as_slice())).await.unwrap_err();
        assert_matches!(err, NacosError::InvalidArgument(_));

        let err = publisher(&service).publish("", None).await.unwrap_err();
        assert_matches!(err, NacosError::InvalidArgument(_));
        assert_eq!(service.publish_calls(), 0);
        assert_eq!(service.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_absent_rules_publish_nothing() {
        let service = Arc::new(MockConfigService::default());
        publisher(&service).publish("orders", None).await.unwrap();
        assert_eq!(service.publish_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_rule_list_is_published() {
        let service = Arc::new(MockConfigService::default());
        publisher(&service).publish("orders", Some([].as_slice())).await.unwrap();
        assert_eq!(service.publish_calls(), 1);
        assert_eq!(service.content("orders-flow-rules", "SENTINEL_GROUP").as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_publishes_json_under_lower_cased_data_id() {
        let service = Arc::new(MockConfigService::default());
        publisher(&service).publish("Orders", Some(rules().as_slice())).await.unwrap();

        assert_eq!(service.publish_calls(), 1);
        assert_eq!(service.last_config_type(), Some(ConfigType::Json));
        let content = service.content("orders-flow-rules", "SENTINEL_GROUP").unwrap();
        assert_eq!(content, serde_json::to_string_pretty(&rules()).unwrap());
    }

    #[tokio::test]
    async fn test_authority_rules_are_published_compact() {
        let service = Arc::new(MockConfigService::default());
        let publisher: RuleNacosPublisher<AuthorityRuleEntity, _> =
            RuleNacosPublisher::new(service.clone(), Arc::new(NacosSentinelProperties::default()));
        let rules = vec![AuthorityRuleEntity {
            rule: Some(AuthorityRule { resource: Some("/admin".to_string()), ..Default::default() }),
            ..Default::default()
        }];

        publisher.publish("gateway", Some(rules.as_slice())).await.unwrap();
        let content = service.content("gateway-authority-rules", "SENTINEL_GROUP").unwrap();
        assert_eq!(content, r#"[{"rule":{"resource":"/admin","strategy":0}}]"#);
    }

    #[tokio::test]
    async fn test_rejected_publish_is_generic_failure() {
        let service = Arc::new(MockConfigService::default());
        service.reject_publish();
        let err = publisher(&service).publish("orders", Some(rules().as_slice())).await.unwrap_err();
        assert_matches!(err, NacosError::PublishFailed);
        assert!(err.to_string().contains("server logs"));
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let service = Arc::new(MockConfigService::default());
        let publisher = publisher(&service);
        publisher.publish("orders", Some(rules().as_slice())).await.unwrap();
        publisher.publish("orders", Some([].as_slice())).await.unwrap();
        assert_eq!(service.content("orders-flow-rules", "SENTINEL_GROUP").as_deref(), Some("[]"));
    }
}
