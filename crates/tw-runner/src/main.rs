//! # tw-runner
//!
//! Main entry point for the tickwire trade relay.
//!
//! Loads an optional JSON configuration file, creates one trade feed
//! connector per configured exchange, forwards every trade to the downstream
//! gRPC ingestion service and stops the connectors on Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! tw-runner config.json --log-level info
//! GRPC_SERVER_ADDR=10.0.0.5:50051 tw-runner -e huobi -e bittrex
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{error, info, warn};
use tw_core::Exchange;
use tw_core::config::{AppConfig, ConnectorConfig};
use tw_core::logging::LogOptions;
use tw_md::FeedModule;
use tw_md::sink::{GrpcSink, TradeSink};

/// Exchange trade relay runner.
#[derive(Parser)]
#[command(name = "tw-runner", about = "Exchange trade relay: streams trades and pushes them downstream")]
struct Cli {
    /// Configuration file path (JSON).
    config: Option<PathBuf>,

    /// Exchange to run (repeatable). Overrides the config's connector list;
    /// with neither, every supported exchange runs.
    #[arg(short, long = "exchange")]
    exchanges: Vec<String>,

    /// Downstream gRPC address (`host:port`).
    #[arg(long, env = "GRPC_SERVER_ADDR")]
    grpc_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,
}

/// Connector entries to run: explicit `--exchange` names win, then the
/// config file, then every supported exchange with defaults.
fn connector_configs(cli_exchanges: &[String], config: &AppConfig) -> Vec<ConnectorConfig> {
    if !cli_exchanges.is_empty() {
        return cli_exchanges
            .iter()
            .map(|name| {
                config
                    .connectors
                    .iter()
                    .find(|c| c.exchange.eq_ignore_ascii_case(name))
                    .cloned()
                    .unwrap_or_else(|| ConnectorConfig::for_exchange(name))
            })
            .collect();
    }
    if !config.connectors.is_empty() {
        return config.connectors.clone();
    }
    Exchange::ALL.iter().map(|e| ConnectorConfig::for_exchange(e.as_str())).collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = match &cli.config {
        Some(path) => tw_core::config::load_config(path)?,
        None => AppConfig::default(),
    };

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    let _log_guard = tw_core::logging::init_logging(&LogOptions {
        level: &cli.log_level,
        dir: log_dir.as_deref(),
        file_prefix: "tw-runner",
        json_file: true,
    });

    info!(
        "{} starting, config={}, log_level={}",
        config.module_name(),
        cli.config.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<none>".into()),
        cli.log_level,
    );

    // 3. Downstream sink, shared by every connector
    let grpc_addr = tw_core::config::resolve_grpc_addr(cli.grpc_addr.as_deref(), &config);
    let sink: Arc<dyn TradeSink> = Arc::new(GrpcSink::connect_lazy(&grpc_addr)?);
    info!("forwarding trades to {grpc_addr}");

    // 4. Create feed modules
    let mut modules: Vec<Box<dyn FeedModule>> = Vec::new();
    for (idx, conn_config) in connector_configs(&cli.exchanges, &config).iter().enumerate() {
        match tw_md::registry::create_feed_module(conn_config, sink.clone()) {
            Ok(module) => {
                info!("connector[{idx}]: created module '{}'", module.name());
                modules.push(module);
            }
            Err(e) => {
                error!("connector[{idx}]: failed to create module for '{}': {e}", conn_config.exchange);
            }
        }
    }
    if modules.is_empty() {
        bail!("no connector could be created");
    }

    // 5. Start all modules
    for module in &mut modules {
        module.start().await?;
        info!("module '{}' started", module.name());
    }

    info!("all {} module(s) started, press Ctrl+C to stop", modules.len());

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // 7. Stop all modules gracefully
    for module in &mut modules {
        info!("stopping module '{}'", module.name());
        if let Err(e) = module.stop().await {
            warn!("error stopping '{}': {e}", module.name());
        }
    }

    info!("all modules stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_names_override_config_but_keep_its_settings() {
        let config: AppConfig = config_from_file(
            r#"{"connectors":[{"exchange":"bittrex","api_key":"k","api_secret":"s"},{"exchange":"huobi"}]}"#,
        );
        let picked = connector_configs(&["Bittrex".into()], &config);
        assert_eq!(picked.len(), 1);
        assert!(picked[0].credentials().is_some());

        let picked = connector_configs(&["binance".into()], &config);
        assert_eq!(picked[0].exchange, "binance");
    }

    #[test]
    fn defaults_to_every_exchange() {
        let picked = connector_configs(&[], &AppConfig::default());
        let names: Vec<_> = picked.iter().map(|c| c.exchange.as_str()).collect();
        assert_eq!(names, ["huobi", "bittrex", "binance", "kraken"]);
    }

    #[test]
    fn cli_parses_repeated_exchanges() {
        let cli = Cli::try_parse_from(["tw-runner", "-e", "huobi", "--exchange", "binance", "--grpc-addr", "h:1"]).unwrap();
        assert_eq!(cli.exchanges, ["huobi", "binance"]);
        assert_eq!(cli.grpc_addr.as_deref(), Some("h:1"));
        assert!(cli.config.is_none());
    }

    fn config_from_file(text: &str) -> AppConfig {
        let path = std::env::temp_dir().join(format!("tw-runner-test-{}.json", std::process::id()));
        std::fs::write(&path, text).unwrap();
        let config = tw_core::config::load_config(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        config
    }
}
