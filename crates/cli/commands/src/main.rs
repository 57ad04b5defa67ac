//! `sentinel-nacos`: read and publish Sentinel dashboard rules stored in Nacos.

mod args;
mod nacos;

use args::NacosArgs;
use clap::Parser;
use eyre::WrapErr;
use nacos::Commands;
use sentinel_nacos::NacosRuleStore;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sentinel-nacos", version, about = "Sync Sentinel dashboard rules with Nacos")]
struct Cli {
    #[command(flatten)]
    nacos: NacosArgs,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let properties = cli.nacos.load_properties()?;

    match cli.command {
        Commands::Properties => nacos::print_properties(&properties, &mut std::io::stdout().lock()),
        Commands::Get(command) => {
            let store = NacosRuleStore::connect(properties).wrap_err("Failed to create Nacos client")?;
            command.execute(&store, &mut std::io::stdout().lock()).await
        }
        Commands::Publish(command) => {
            let store = NacosRuleStore::connect(properties).wrap_err("Failed to create Nacos client")?;
            command.execute(&store).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_nacos::RuleKind;

    #[test]
    fn test_parse_get() {
        let cli = Cli::try_parse_from([
            "sentinel-nacos",
            "get",
            "--app",
            "orders",
            "--kind",
            "param-flow",
            "--nacos.server-addr",
            "localhost:8848",
        ])
        .unwrap();
        assert_eq!(cli.nacos.server_addr.as_deref(), Some("localhost:8848"));
        match cli.command {
            Commands::Get(get) => {
                assert_eq!(get.app, "orders");
                assert_eq!(get.kind, RuleKind::ParamFlow);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_rule_kind() {
        let result =
            Cli::try_parse_from(["sentinel-nacos", "get", "--app", "orders", "--kind", "gateway"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_publish_requires_file() {
        let result =
            Cli::try_parse_from(["sentinel-nacos", "publish", "--app", "orders", "--kind", "flow"]);
        assert!(result.is_err());
    }
}
