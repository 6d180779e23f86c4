//! Defines the command line interface for the relayer.

use clap::Parser;

/// The command line interface for the relayer.
#[derive(Clone, Debug, Parser)]
#[command(
    name = "header-relayer",
    version,
    about = "Header relayer - keeps on-chain bridges in step with their source chains",
    long_about = "Follows one or more source chains and submits their block headers to the bridge\ncontract deployed for each of them on the target chain."
)]
pub struct RelayerCli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// The subcommands for the relayer.
#[derive(Clone, Debug, Parser)]
pub enum Commands {
    /// Relay headers until interrupted.
    Start(start::Args),
    /// Record the bridge address of a network in the configuration file.
    SetBridge(set_bridge::Args),
}

/// The arguments for the start subcommand.
pub mod start {
    use alloy::primitives::Address;
    use header_relay_core::config::DEFAULT_CONFIG_FILE;

    use super::Parser;

    /// The arguments for the start subcommand.
    #[derive(Clone, Debug, Parser)]
    pub struct Args {
        /// The configuration file for the relayer.
        #[clap(long, default_value = DEFAULT_CONFIG_FILE)]
        pub config: String,
        /// The networks to relay; every configured network when omitted.
        #[clap(long = "network", env = "NETWORK", value_delimiter = ',')]
        pub networks: Vec<String>,
        /// Overrides the configured bridge address; requires exactly one network.
        #[clap(long, env = "BRIDGE")]
        pub bridge: Option<Address>,
    }
}

/// The arguments for the set-bridge subcommand.
pub mod set_bridge {
    use alloy::primitives::Address;
    use header_relay_core::config::DEFAULT_CONFIG_FILE;

    use super::Parser;

    /// The arguments for the set-bridge subcommand.
    #[derive(Clone, Debug, Parser)]
    pub struct Args {
        /// The configuration file to update.
        #[clap(long, default_value = DEFAULT_CONFIG_FILE)]
        pub config: String,
        /// The network the bridge tracks.
        #[clap(long, env = "NETWORK")]
        pub network: String,
        /// The address of the deployed bridge.
        #[clap(long)]
        pub address: Address,
    }
}
