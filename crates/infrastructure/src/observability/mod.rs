//! Observability module
//!
//! Metrics collection and the Prometheus exporter.

pub mod metrics_collector;

pub use metrics_collector::DispatchMetrics;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::info;

/// Install the Prometheus exporter with an HTTP listener
pub fn init_metrics(bind_address: &str) -> Result<()> {
    let addr: SocketAddr = bind_address
        .parse()
        .with_context(|| format!("无效的指标监听地址: {bind_address}"))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    info!("Prometheus metrics exporter listening on {}", addr);
    Ok(())
}
