//! Defines the [`RelayerBuilder`] struct that turns the configuration into running sync engines.

use alloy::{
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use anyhow::Context;
use header_relay_lib::{
    bridge::{BridgeContract, BridgeContractClient},
    engine::SyncEngine,
    source::{EthSourceClient, SourceChainClient},
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::RelayerConfig;

/// A sync engine relaying over JSON-RPC.
pub type EthSyncEngine = SyncEngine<EthSourceClient<DynProvider>, BridgeContract<DynProvider>>;

/// The `RelayerBuilder` holds one sync engine per selected network.
#[allow(clippy::module_name_repetitions)]
pub struct RelayerBuilder<S = EthSourceClient<DynProvider>, B = BridgeContract<DynProvider>> {
    engines: Vec<SyncEngine<S, B>>,
}

impl RelayerBuilder {
    /// Connects to the target chain and to every selected source chain.
    ///
    /// `bridge_override` replaces the configured bridge address and is only accepted together
    /// with a single network.
    ///
    /// # Errors
    /// Returns an error if a network is unknown or has no bridge, the private key is missing or
    /// malformed, or a provider cannot be created.
    #[instrument(skip(config), err(Debug))]
    pub async fn from_config(
        config: &RelayerConfig,
        networks: &[String],
        bridge_override: Option<Address>,
    ) -> anyhow::Result<Self> {
        let networks = config.select_networks(networks)?;
        anyhow::ensure!(
            bridge_override.is_none() || networks.len() == 1,
            "a bridge address can only be given for a single network, got {}",
            networks.len()
        );

        let signer: PrivateKeySigner = config
            .target
            .private_key()?
            .parse()
            .context("invalid target private key")?;
        info!(submitter = %signer.address(), "Loaded submitter key");
        let target = ProviderBuilder::new()
            .wallet(signer)
            .connect(&config.target.rpc_url)
            .await
            .with_context(|| format!("failed to connect to target {}", config.target.rpc_url))?
            .erased();

        let mut engines = Vec::with_capacity(networks.len());
        for name in networks {
            let network = config.network(&name)?;
            let address = match bridge_override {
                Some(address) => address,
                None => network.bridge_address()?.with_context(|| {
                    format!(
                        "no bridge configured for network {name}; deploy one and record it with `set-bridge --network {name} --address <address>`"
                    )
                })?,
            };

            let provider = ProviderBuilder::new()
                .connect(&network.rpc)
                .await
                .with_context(|| format!("failed to connect to network {name} at {}", network.rpc))?
                .erased();
            let source = EthSourceClient::new(provider);
            let chain_id = source.chain_id().await?;
            let bridge =
                BridgeContract::new(address, target.clone(), config.target.confirm_submissions);
            info!(
                network = %name,
                chain_id,
                bridge = %bridge.address(),
                poa = network.poa,
                bomb_delay_from_parent = network.bomb_delay_from_parent,
                "Configured network"
            );

            engines.push(SyncEngine::new(name, source, bridge, config.sync.clone()));
        }

        Ok(Self { engines })
    }
}

impl<S, B> RelayerBuilder<S, B>
where
    S: SourceChainClient + 'static,
    B: BridgeContractClient + 'static,
{
    /// Wraps already built engines.
    #[must_use]
    pub const fn from_engines(engines: Vec<SyncEngine<S, B>>) -> Self {
        Self { engines }
    }

    /// The networks the engines relay.
    #[must_use]
    pub fn networks(&self) -> Vec<&str> {
        self.engines.iter().map(SyncEngine::network).collect()
    }

    /// Runs every engine on its own task until `shutdown` is cancelled.
    ///
    /// The first engine that fails cancels all others.
    ///
    /// # Errors
    /// Returns the first fatal engine error.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let mut tasks = JoinSet::new();
        for mut engine in self.engines {
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                let result = engine.run(shutdown).await;
                result.with_context(|| format!("network {}", engine.network()))
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(anyhow::Error::from)
                .and_then(|result| result);
            if let Err(err) = result {
                error!(error = ?err, "Sync engine stopped with an error");
                shutdown.cancel();
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
