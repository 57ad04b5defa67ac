//! `get`, `publish` and `properties` commands.

use clap::{Args, Subcommand};
use eyre::WrapErr;
use sentinel_nacos::{
    properties::property_key, AuthorityRuleEntity, ConfigService, DegradeRuleEntity,
    DynamicRuleProvider, DynamicRulePublisher, FlowRuleEntity, NacosRuleStore,
    NacosSentinelProperties, ParamFlowRuleEntity, RuleEntity, RuleKind, SystemRuleEntity,
};
use std::{io::Write, path::PathBuf};
use tracing::info;

/// Expands `$body` with `$rule` bound to the entity type of `$kind`.
macro_rules! with_rule_type {
    ($kind:expr, $rule:ident => $body:expr) => {
        match $kind {
            RuleKind::Flow => {
                type $rule = FlowRuleEntity;
                $body
            }
            RuleKind::Degrade => {
                type $rule = DegradeRuleEntity;
                $body
            }
            RuleKind::ParamFlow => {
                type $rule = ParamFlowRuleEntity;
                $body
            }
            RuleKind::System => {
                type $rule = SystemRuleEntity;
                $body
            }
            RuleKind::Authority => {
                type $rule = AuthorityRuleEntity;
                $body
            }
        }
    };
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Print the rules stored for an application.
    Get(GetCommand),
    /// Replace the rules stored for an application with the contents of a file.
    Publish(PublishCommand),
    /// Print the property set the Nacos client is built from.
    Properties,
}

#[derive(Debug, Args)]
pub(crate) struct GetCommand {
    /// Application name. Case-insensitive.
    #[arg(long, value_name = "APP")]
    pub(crate) app: String,

    /// Rule kind: flow, degrade, param-flow, system or authority.
    #[arg(long, value_name = "KIND")]
    pub(crate) kind: RuleKind,
}

#[derive(Debug, Args)]
pub(crate) struct PublishCommand {
    /// Application name. Case-insensitive.
    #[arg(long, value_name = "APP")]
    pub(crate) app: String,

    /// Rule kind: flow, degrade, param-flow, system or authority.
    #[arg(long, value_name = "KIND")]
    pub(crate) kind: RuleKind,

    /// JSON file holding an array of rules.
    #[arg(long, value_name = "FILE")]
    pub(crate) file: PathBuf,
}

impl GetCommand {
    pub(crate) async fn execute<S: ConfigService + ?Sized>(
        &self,
        store: &NacosRuleStore<S>,
        out: &mut impl Write,
    ) -> eyre::Result<()> {
        let rendered = with_rule_type!(self.kind, Rule => render_rules::<Rule, S>(store, &self.app).await?);
        writeln!(out, "{rendered}")?;
        Ok(())
    }
}

async fn render_rules<T: RuleEntity, S: ConfigService + ?Sized>(
    store: &NacosRuleStore<S>,
    app: &str,
) -> eyre::Result<String> {
    let rules: Vec<T> = store
        .provider::<T>()
        .get_rules(app)
        .await
        .wrap_err_with(|| format!("Failed to read {} rules of {app}", T::KIND))?;
    Ok(serde_json::to_string_pretty(&rules)?)
}

impl PublishCommand {
    pub(crate) async fn execute<S: ConfigService + ?Sized>(
        &self,
        store: &NacosRuleStore<S>,
    ) -> eyre::Result<()> {
        let content = std::fs::read_to_string(&self.file)
            .wrap_err_with(|| format!("Failed to read {}", self.file.display()))?;
        let count = with_rule_type!(self.kind, Rule => publish_rules::<Rule, S>(store, &self.app, &content).await?);
        info!(target: "sentinel::cli", "Published {} {} rules for {}", count, self.kind, self.app);
        Ok(())
    }
}

async fn publish_rules<T: RuleEntity, S: ConfigService + ?Sized>(
    store: &NacosRuleStore<S>,
    app: &str,
    content: &str,
) -> eyre::Result<usize> {
    // Empty or `null` content is an error here, unlike the lenient rule decoder.
    let rules: Vec<T> = serde_json::from_str(content)
        .wrap_err_with(|| format!("Rule file is not a valid list of {} rules", T::KIND))?;
    store
        .publisher::<T>()
        .publish(app, Some(rules.as_slice()))
        .await
        .wrap_err_with(|| format!("Failed to publish {} rules of {app}", T::KIND))?;
    Ok(rules.len())
}

/// Write the assembled client properties with credentials masked.
pub(crate) fn print_properties(
    properties: &NacosSentinelProperties,
    out: &mut impl Write,
) -> eyre::Result<()> {
    for (key, value) in properties.assemble_config_service_properties().iter() {
        let masked = matches!(key, property_key::PASSWORD | property_key::SECRET_KEY);
        let value = if masked && !value.is_empty() { "******" } else { value };
        writeln!(out, "{key}={value}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_nacos::test_utils::MockConfigService;
    use std::sync::Arc;

    fn store(service: &Arc<MockConfigService>) -> NacosRuleStore<MockConfigService> {
        NacosRuleStore::new(service.clone(), Arc::new(NacosSentinelProperties::default()))
    }

    #[tokio::test]
    async fn test_get_prints_stored_rules() {
        let service = Arc::new(MockConfigService::default());
        service.insert("orders-degrade-rules", "SENTINEL_GROUP", r#"[{"resource":"/a","count":1.5}]"#);

        let command = GetCommand { app: "Orders".to_string(), kind: RuleKind::Degrade };
        let mut out = Vec::new();
        command.execute(&store(&service), &mut out).await.unwrap();

        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed[0]["resource"], "/a");
        assert_eq!(printed[0]["count"], 1.5);
    }

    #[tokio::test]
    async fn test_get_without_rules_prints_empty_list() {
        let service = Arc::new(MockConfigService::default());
        let command = GetCommand { app: "orders".to_string(), kind: RuleKind::System };
        let mut out = Vec::new();
        command.execute(&store(&service), &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "[]");
    }

    #[tokio::test]
    async fn test_publish_from_file() {
        let service = Arc::new(MockConfigService::default());
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"[{"rule":{"resource":"/admin","limitApp":"ops","strategy":1}}]"#)
            .unwrap();

        let command = PublishCommand {
            app: "Gateway".to_string(),
            kind: RuleKind::Authority,
            file: file.path().to_path_buf(),
        };
        command.execute(&store(&service)).await.unwrap();

        assert_eq!(
            service.content("gateway-authority-rules", "SENTINEL_GROUP").as_deref(),
            Some(r#"[{"rule":{"resource":"/admin","limitApp":"ops","strategy":1}}]"#)
        );
    }

    #[tokio::test]
    async fn test_publish_rejects_invalid_file() {
        let service = Arc::new(MockConfigService::default());
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"resource": "/a"}"#).unwrap();

        let command = PublishCommand {
            app: "orders".to_string(),
            kind: RuleKind::Flow,
            file: file.path().to_path_buf(),
        };
        assert!(command.execute(&store(&service)).await.is_err());
        assert_eq!(service.publish_calls(), 0);
    }

    #[tokio::test]
    async fn test_publish_rejects_empty_file() {
        let service = Arc::new(MockConfigService::default());
        service.insert("orders-flow-rules", "SENTINEL_GROUP", r#"[{"resource":"/a"}]"#);

        for content in ["", "  \n", "null"] {
            let file = tempfile::NamedTempFile::new().unwrap();
            std::fs::write(file.path(), content).unwrap();
            let command = PublishCommand {
                app: "orders".to_string(),
                kind: RuleKind::Flow,
                file: file.path().to_path_buf(),
            };
            assert!(command.execute(&store(&service)).await.is_err());
        }

        assert_eq!(service.publish_calls(), 0);
        assert_eq!(
            service.content("orders-flow-rules", "SENTINEL_GROUP").as_deref(),
            Some(r#"[{"resource":"/a"}]"#)
        );
    }

    #[tokio::test]
    async fn test_publish_explicit_empty_list() {
        let service = Arc::new(MockConfigService::default());
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[]").unwrap();

        let command = PublishCommand {
            app: "orders".to_string(),
            kind: RuleKind::Flow,
            file: file.path().to_path_buf(),
        };
        command.execute(&store(&service)).await.unwrap();
        assert_eq!(service.publish_calls(), 1);
    }

    #[test]
    fn test_print_properties_masks_secrets() {
        let properties = NacosSentinelProperties {
            server_addr: Some("localhost:8848".to_string()),
            password: Some("hunter2".to_string()),
            namespace: Some("public".to_string()),
            ..Default::default()
        };
        let mut out = Vec::new();
        print_properties(&properties, &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        assert!(printed.contains("serverAddr=localhost:8848\n"));
        assert!(printed.contains("password=******\n"));
        assert!(printed.contains("secretKey=\n"));
        assert!(printed.contains("namespace=\n"));
        assert!(!printed.contains("hunter2"));
    }
}
