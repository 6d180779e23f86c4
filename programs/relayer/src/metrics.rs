//! Serves the prometheus registry over HTTP.

use std::net::SocketAddr;

use prometheus::{Encoder, TextEncoder};
use tracing::{error, info};
use warp::Filter;

/// Renders every registered metric in the prometheus text format.
#[must_use]
pub fn render() -> String {
    let mut buffer = Vec::new();
    if let Err(err) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        error!(%err, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Spawns the `/metrics` endpoint on `addr`.
pub fn spawn_metrics_server(addr: SocketAddr) {
    tokio::spawn(async move {
        let metrics_route = warp::path("metrics".to_string()).map(render);

        info!("Metrics available at http://{addr}/metrics");
        warp::serve(metrics_route).run(addr).await;
    });
}
