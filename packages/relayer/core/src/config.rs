//! Defines the top level configuration for the relayer.

use std::{
    collections::BTreeMap,
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::primitives::Address;
use anyhow::{ensure, Context};
use header_relay_lib::engine::SyncConfig;
use tracing::Level;

/// The file the relayer reads its configuration from unless told otherwise.
pub const DEFAULT_CONFIG_FILE: &str = "bridgeconfig.json";

/// The default delay of the difficulty bomb, relative to the parent block.
pub const DEFAULT_BOMB_DELAY_FROM_PARENT: u64 = 900_000_000;

/// The top level configuration for the relayer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[allow(clippy::module_name_repetitions)]
pub struct RelayerConfig {
    /// The source chains the relayer can follow, by name.
    pub networks: BTreeMap<String, NetworkConfig>,
    /// The chain hosting the bridge contracts.
    pub target: TargetConfig,
    /// Tuning of the sync engines.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Logging and tracing.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// The prometheus endpoint.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// A source chain and the bridge that tracks it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[allow(clippy::module_name_repetitions)]
pub struct NetworkConfig {
    /// The JSON-RPC endpoint of the source chain.
    pub rpc: String,
    /// Whether the source chain runs proof-of-authority consensus.
    #[serde(default)]
    pub poa: bool,
    /// The bridge deployed for this network.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Passed to the bridge at deployment; the relayer only reports it.
    #[serde(default = "default_bomb_delay")]
    pub bomb_delay_from_parent: u64,
}

/// The bridge contract of a network.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[allow(clippy::module_name_repetitions)]
pub struct BridgeConfig {
    /// The address of the deployed bridge, if any.
    #[serde(default)]
    pub address: Option<String>,
}

/// The chain the headers are submitted to.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[allow(clippy::module_name_repetitions)]
pub struct TargetConfig {
    /// The JSON-RPC endpoint of the target chain.
    pub rpc_url: String,
    /// The environment variable holding the hex private key of the submitter.
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    /// Wait for the receipt of every submission.
    #[serde(default = "default_true")]
    pub confirm_submissions: bool,
}

/// The configuration for logging and tracing.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[allow(clippy::module_name_repetitions)]
pub struct ObservabilityConfig {
    /// The log level.
    #[serde(default = "default_level")]
    pub level: String,
    /// Export traces over OTLP.
    #[serde(default)]
    pub use_otel: bool,
    /// The service name reported to the collector.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// The OTLP collector endpoint; the exporter default is used when absent.
    #[serde(default)]
    pub otel_endpoint: Option<String>,
}

/// The configuration for the prometheus endpoint.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[allow(clippy::module_name_repetitions)]
pub struct MetricsConfig {
    /// Serve metrics at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// The address to bind to.
    #[serde(default = "default_metrics_address")]
    pub address: String,
    /// The port to bind to.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

const fn default_true() -> bool {
    true
}

const fn default_bomb_delay() -> u64 {
    DEFAULT_BOMB_DELAY_FROM_PARENT
}

fn default_private_key_env() -> String {
    "RELAYER_PRIVATE_KEY".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "header-relayer".to_string()
}

fn default_metrics_address() -> String {
    "0.0.0.0".to_string()
}

const fn default_metrics_port() -> u16 {
    9000
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            use_otel: false,
            service_name: default_service_name(),
            otel_endpoint: None,
        }
    }
}

impl ObservabilityConfig {
    /// Returns the log level, `INFO` if it cannot be parsed.
    #[must_use]
    pub fn level(&self) -> Level {
        Level::from_str(&self.level).unwrap_or(Level::INFO)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_metrics_address(),
            port: default_metrics_port(),
        }
    }
}

impl MetricsConfig {
    /// The socket address to serve metrics on.
    /// # Errors
    /// Returns an error if the address is not an IP address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.address, self.port)
            .parse()
            .with_context(|| format!("invalid metrics address {}", self.address))
    }
}

impl NetworkConfig {
    /// The parsed bridge address, `None` if no bridge is deployed.
    /// # Errors
    /// Returns an error if the configured address is malformed.
    pub fn bridge_address(&self) -> anyhow::Result<Option<Address>> {
        self.bridge
            .address
            .as_deref()
            .map(|address| {
                Address::from_str(address).with_context(|| format!("invalid bridge address {address}"))
            })
            .transpose()
    }
}

impl TargetConfig {
    /// Reads the submitter private key from the environment.
    /// # Errors
    /// Returns an error if the variable is not set.
    pub fn private_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.private_key_env)
            .with_context(|| format!("environment variable {} is not set", self.private_key_env))
    }
}

impl RelayerConfig {
    /// Reads, parses and validates a configuration file.
    /// # Errors
    /// Returns an error if the file cannot be read, is not a valid configuration, or fails
    /// validation.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_slice(&raw)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        let config: Self = parse_config(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the parts of the configuration serde cannot.
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.networks.is_empty(), "no networks configured");
        for (name, network) in &self.networks {
            url::Url::parse(&network.rpc)
                .with_context(|| format!("network {name}: invalid rpc url {}", network.rpc))?;
            network
                .bridge_address()
                .with_context(|| format!("network {name}"))?;
        }
        url::Url::parse(&self.target.rpc_url)
            .with_context(|| format!("target: invalid rpc url {}", self.target.rpc_url))?;
        ensure!(
            !self.target.private_key_env.is_empty(),
            "target: private_key_env must not be empty"
        );
        ensure!(
            self.sync.max_batch_size >= 1,
            "sync: max_batch_size must be at least 1"
        );
        if self.metrics.enabled {
            self.metrics.socket_addr()?;
        }
        Ok(())
    }

    /// Looks up a configured network.
    /// # Errors
    /// Returns an error if the network is not configured.
    pub fn network(&self, name: &str) -> anyhow::Result<&NetworkConfig> {
        self.networks.get(name).with_context(|| {
            format!(
                "network {name} is not configured, known networks: {}",
                self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }

    /// Resolves the networks to relay: the requested ones, or every configured network when
    /// none is requested.
    /// # Errors
    /// Returns an error if a requested network is not configured.
    pub fn select_networks(&self, requested: &[String]) -> anyhow::Result<Vec<String>> {
        if requested.is_empty() {
            return Ok(self.networks.keys().cloned().collect());
        }

        let mut selected = Vec::with_capacity(requested.len());
        for name in requested {
            self.network(name)?;
            if !selected.contains(name) {
                selected.push(name.clone());
            }
        }
        Ok(selected)
    }

    /// Returns the configuration with the bridge of `network` set to `address`.
    /// # Errors
    /// Returns an error if the network is not configured.
    pub fn with_bridge_address(mut self, network: &str, address: Address) -> anyhow::Result<Self> {
        self.network(network)?;
        if let Some(config) = self.networks.get_mut(network) {
            config.bridge.address = Some(address.to_checksum(None));
        }
        Ok(self)
    }

    /// Writes the configuration as pretty JSON, replacing `path` atomically.
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let mut contents = serde_json::to_string_pretty(self)?;
        contents.push('\n');

        let mut tmp = PathBuf::from(path);
        tmp.as_mut_os_string().push(".tmp");
        fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;

        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

/// Parse a configuration value into the target struct while producing detailed path-aware
/// error messages.
///
/// It leverages `serde_path_to_error` to include the exact JSON path of the failure
/// (e.g. `networks.bsc.rpc`).
///
/// # Errors
/// Returns an [`anyhow::Error`] with the precise path and the original serde error message.
pub fn parse_config<T>(value: serde_json::Value) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    // Round-trip through a string so the deserializer reports line and column.
    let json_string = value.to_string();

    let mut deserializer = serde_json::Deserializer::from_str(&json_string);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer)
        .map_err(|e| anyhow::anyhow!("config error at {}: {}", e.path(), e))
}
