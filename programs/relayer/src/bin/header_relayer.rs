use clap::Parser;
use header_relay_core::{
    builder::RelayerBuilder,
    config::{ObservabilityConfig, RelayerConfig},
};
use header_relayer::{
    cli::{Commands, RelayerCli},
    metrics::spawn_metrics_server,
    observability::init_observability,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = RelayerCli::parse();

    match cli.command {
        Commands::Start(args) => {
            let config = RelayerConfig::from_file(&args.config)?;

            let _guard = init_observability(&config.observability)?;
            info!(
                "Observability initialized with level: {}",
                config.observability.level()
            );

            let relayer = RelayerBuilder::from_config(&config, &args.networks, args.bridge).await?;

            if config.metrics.enabled {
                spawn_metrics_server(config.metrics.socket_addr()?);
            }

            let shutdown = CancellationToken::new();
            tokio::spawn(cancel_on_signal(shutdown.clone()));

            info!(networks = ?relayer.networks(), "Starting header relayer");
            relayer.run(shutdown).await?;
            info!("Header relayer stopped");

            Ok(())
        }
        Commands::SetBridge(args) => {
            let _guard = init_observability(&ObservabilityConfig::default())?;

            RelayerConfig::from_file(&args.config)?
                .with_bridge_address(&args.network, args.address)?
                .save(&args.config)?;
            info!(network = %args.network, bridge = %args.address, "Bridge address recorded");

            Ok(())
        }
    }
}

/// Cancels `shutdown` on Ctrl-C or, on unix, SIGTERM.
async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(%err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                error!(%err, "Failed to listen for Ctrl-C");
                return;
            }
        }
        () = terminate => {}
    }

    info!("Shutdown requested, stopping after the current iteration");
    shutdown.cancel();
}
