use clap::Args;
use eyre::WrapErr;
use sentinel_nacos::NacosSentinelProperties;
use std::path::PathBuf;

/// Where the Nacos connection properties come from.
///
/// Values given on the command line (or through `NACOS_*` environment
/// variables) override the ones read from `--config`.
#[derive(Clone, Debug, Default, Args)]
#[command(next_help_heading = "Nacos")]
pub(crate) struct NacosArgs {
    /// Spring-style YAML file with a `spring.cloud.sentinel.nacos.config` section.
    #[arg(long = "config", value_name = "FILE", global = true, verbatim_doc_comment)]
    pub(crate) config: Option<PathBuf>,

    /// Comma-separated Nacos server addresses.
    #[arg(
        id = "nacos.server-addr",
        long = "nacos.server-addr",
        value_name = "ADDR",
        env = "NACOS_SERVER_ADDR",
        global = true
    )]
    pub(crate) server_addr: Option<String>,

    /// Nacos authentication username.
    #[arg(long = "nacos.username", value_name = "USER", env = "NACOS_USERNAME", global = true)]
    pub(crate) username: Option<String>,

    /// Nacos authentication password.
    #[arg(
        long = "nacos.password",
        value_name = "PASSWORD",
        env = "NACOS_PASSWORD",
        hide_env_values = true,
        global = true
    )]
    pub(crate) password: Option<String>,

    /// Namespace id. `public` addresses the default namespace.
    #[arg(long = "nacos.namespace", value_name = "ID", env = "NACOS_NAMESPACE", global = true)]
    pub(crate) namespace: Option<String>,

    /// Config group the rules are stored in.
    #[arg(long = "nacos.group", value_name = "GROUP", env = "NACOS_GROUP", global = true)]
    pub(crate) group: Option<String>,

    /// Charset of the config content.
    #[arg(long = "nacos.encode", value_name = "CHARSET", global = true)]
    pub(crate) encode: Option<String>,

    /// Read timeout in milliseconds.
    #[arg(long = "nacos.timeout", value_name = "MILLIS", global = true)]
    pub(crate) timeout: Option<u64>,

    /// Maximum number of attempts across servers.
    #[arg(long = "nacos.max-retry", value_name = "N", global = true)]
    pub(crate) max_retry: Option<String>,

    /// Long poll timeout in milliseconds.
    #[arg(long = "nacos.config-long-poll-timeout", value_name = "MILLIS", global = true)]
    pub(crate) config_long_poll_timeout: Option<String>,

    /// Delay between failed attempts in milliseconds.
    #[arg(long = "nacos.config-retry-time", value_name = "MILLIS", global = true)]
    pub(crate) config_retry_time: Option<String>,

    /// Pull the config remotely on first load.
    #[arg(long = "nacos.enable-remote-sync-config", global = true)]
    pub(crate) enable_remote_sync_config: bool,

    /// Namespace access key.
    #[arg(long = "nacos.access-key", value_name = "KEY", env = "NACOS_ACCESS_KEY", global = true)]
    pub(crate) access_key: Option<String>,

    /// Namespace secret key.
    #[arg(
        long = "nacos.secret-key",
        value_name = "KEY",
        env = "NACOS_SECRET_KEY",
        hide_env_values = true,
        global = true
    )]
    pub(crate) secret_key: Option<String>,

    /// Nacos cluster name.
    #[arg(long = "nacos.cluster-name", value_name = "NAME", global = true)]
    pub(crate) cluster_name: Option<String>,
}

impl NacosArgs {
    /// Read `--config` if given and apply the command line overrides.
    pub(crate) fn load_properties(&self) -> eyre::Result<NacosSentinelProperties> {
        let mut properties = match &self.config {
            Some(path) => NacosSentinelProperties::from_yaml_file(path)
                .wrap_err_with(|| format!("Failed to load {}", path.display()))?,
            None => NacosSentinelProperties::default(),
        };
        self.apply_overrides(&mut properties);
        Ok(properties)
    }

    fn apply_overrides(&self, properties: &mut NacosSentinelProperties) {
        fn set(target: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        set(&mut properties.server_addr, &self.server_addr);
        set(&mut properties.username, &self.username);
        set(&mut properties.password, &self.password);
        set(&mut properties.namespace, &self.namespace);
        set(&mut properties.encode, &self.encode);
        set(&mut properties.max_retry, &self.max_retry);
        set(&mut properties.config_long_poll_timeout, &self.config_long_poll_timeout);
        set(&mut properties.config_retry_time, &self.config_retry_time);
        set(&mut properties.access_key, &self.access_key);
        set(&mut properties.secret_key, &self.secret_key);
        set(&mut properties.cluster_name, &self.cluster_name);
        if let Some(group) = &self.group {
            properties.group.clone_from(group);
        }
        if let Some(timeout) = self.timeout {
            properties.timeout = timeout;
        }
        if self.enable_remote_sync_config {
            properties.enable_remote_sync_config = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    /// A helper type to parse Args more easily
    #[derive(Parser)]
    struct CommandParser<T: Args> {
        #[command(flatten)]
        args: T,
    }

    #[test]
    fn test_parse_overrides() {
        let args = CommandParser::<NacosArgs>::parse_from([
            "sentinel-nacos",
            "--nacos.server-addr",
            "10.0.0.1:8848",
            "--nacos.namespace",
            "dev",
            "--nacos.timeout",
            "500",
            "--nacos.enable-remote-sync-config",
        ])
        .args;

        let properties = args.load_properties().unwrap();
        assert_eq!(properties.server_addr.as_deref(), Some("10.0.0.1:8848"));
        assert_eq!(properties.namespace.as_deref(), Some("dev"));
        assert_eq!(properties.timeout, 500);
        assert_eq!(properties.group, "SENTINEL_GROUP");
        assert!(properties.enable_remote_sync_config);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "spring:\n  cloud:\n    sentinel:\n      nacos:\n        config:\n          server-addr: file:8848\n          group: FROM_FILE\n          username: nacos"
        )
        .unwrap();

        let args = NacosArgs {
            config: Some(file.path().to_path_buf()),
            server_addr: Some("cli:8848".to_string()),
            ..Default::default()
        };
        let properties = args.load_properties().unwrap();
        assert_eq!(properties.server_addr.as_deref(), Some("cli:8848"));
        assert_eq!(properties.group, "FROM_FILE");
        assert_eq!(properties.username.as_deref(), Some("nacos"));
    }

    #[test]
    fn test_missing_config_file() {
        let args = NacosArgs {
            config: Some(PathBuf::from("/nonexistent/sentinel-nacos.yml")),
            ..Default::default()
        };
        let err = args.load_properties().unwrap_err();
        assert!(format!("{err:#}").contains("Failed to load"));
    }
}
