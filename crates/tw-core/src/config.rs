//! Configuration for the tickwire runner.
//!
//! Settings come from an optional JSON file. The top-level structure holds
//! logging metadata, the downstream gRPC address, and a `connectors` array
//! where each entry describes one exchange connector. Catalog and streaming
//! URLs are compiled into each exchange module and are not configurable.
//!
//! # Example config
//!
//! ```json
//! {
//!   "module": { "module_name": "tickwire", "log_path": "/var/log/tickwire" },
//!   "grpc_addr": "10.0.0.5:50051",
//!   "connectors": [
//!     { "exchange": "huobi" },
//!     { "exchange": "bittrex", "api_key": "...", "api_secret": "..." },
//!     { "exchange": "binance", "push_timeout_ms": 1000 }
//!   ]
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Downstream endpoint used when neither the config nor `GRPC_SERVER_ADDR`
/// provides one.
pub const DEFAULT_GRPC_ADDR: &str = "127.0.0.1:50051";

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    pub module: Option<ModuleMeta>,

    /// Downstream ingestion service address (`host:port`).
    pub grpc_addr: Option<String>,

    /// One entry per exchange connector.
    #[serde(default)]
    pub connectors: Vec<ConnectorConfig>,
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// Settings for one exchange connector. Every tunable is optional and has a
/// default matching the long-running "stay up forever" policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectorConfig {
    /// Exchange identifier: `"huobi"`, `"bittrex"`, `"binance"`, `"kraken"`.
    pub exchange: String,

    /// Fixed delay between reconnect (and catalog retry) attempts, seconds.
    pub reconnect_delay_sec: Option<u64>,

    /// How long `Subscribing` waits for acknowledgements before streaming.
    pub ack_timeout_sec: Option<u64>,

    /// Largest single WebSocket message accepted before the connection is
    /// closed deliberately.
    pub max_message_bytes: Option<usize>,

    /// Timeout for one downstream push, milliseconds.
    pub push_timeout_ms: Option<u64>,

    /// Upper bound on concurrent downstream pushes.
    pub max_in_flight: Option<usize>,

    /// API key for exchanges with an authenticated session (Bittrex).
    pub api_key: Option<String>,

    /// API secret paired with `api_key`.
    pub api_secret: Option<String>,
}

impl ConnectorConfig {
    /// Config with defaults for the given exchange.
    pub fn for_exchange(exchange: &str) -> Self {
        Self { exchange: exchange.to_string(), ..Default::default() }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_sec.unwrap_or(5))
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_sec.unwrap_or(10))
    }

    pub fn effective_max_message_bytes(&self) -> usize {
        self.max_message_bytes.unwrap_or(16 << 20)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms.unwrap_or(2_000))
    }

    pub fn effective_max_in_flight(&self) -> usize {
        self.max_in_flight.unwrap_or(64).max(1)
    }

    /// API credentials, if both halves are configured and non-empty.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (self.api_key.as_deref(), self.api_secret.as_deref()) {
            (Some(k), Some(s)) if !k.is_empty() && !s.is_empty() => Some((k.to_string(), s.to_string())),
            _ => None,
        }
    }
}

impl AppConfig {
    /// Returns the log path from the module block.
    pub fn log_path(&self) -> Option<String> {
        self.module.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Returns the module name, defaulting to `"tickwire"`.
    pub fn module_name(&self) -> String {
        self.module.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "tickwire".into())
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Resolve the downstream address: explicit value (CLI / env) first, then the
/// config file, then the loopback default.
pub fn resolve_grpc_addr(explicit: Option<&str>, config: &AppConfig) -> String {
    explicit
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| config.grpc_addr.clone())
        .unwrap_or_else(|| DEFAULT_GRPC_ADDR.to_string())
}
