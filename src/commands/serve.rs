use anyhow::{Context, Result};
use std::path::PathBuf;

use chronometer::clock::system_clock;
use chronometer::config::{Config, StorageBackend};
use chronometer::metrics;
use chronometer::server::TimerServer;
use chronometer::storage::open_store;

/// Command-line overrides for `serve`
#[derive(Debug, Default)]
pub struct ServeParams {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub storage: Option<StorageBackend>,
    pub snapshot_path: Option<PathBuf>,
    pub sqlite_path: Option<PathBuf>,
    pub tick_interval_ms: Option<u64>,
    pub static_dir: Option<String>,
    pub no_cors: bool,
}

impl ServeParams {
    /// Layer these flags over `config`
    pub fn apply(self, config: &mut Config) -> Result<()> {
        if let Some(host) = self.host {
            let ip = host
                .parse()
                .with_context(|| format!("Invalid host address: {host}"))?;
            config.server.bind_address.set_ip(ip);
        }
        if let Some(port) = self.port {
            config.server.bind_address.set_port(port);
        }
        if let Some(backend) = self.storage {
            config.storage.backend = backend;
        }
        if let Some(path) = self.snapshot_path {
            config.storage.snapshot_path = path;
        }
        if let Some(path) = self.sqlite_path {
            config.storage.sqlite_path = path;
        }
        if let Some(ms) = self.tick_interval_ms {
            config.ticker.interval_ms = ms;
        }
        if let Some(dir) = self.static_dir {
            config.server.static_dir = Some(dir);
        }
        if self.no_cors {
            config.server.enable_cors = false;
        }
        Ok(())
    }
}

/// Start the timer server
pub async fn serve(config: Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics initialization failed, continuing without metrics");
    }

    let store = open_store(&config.storage, system_clock()).with_context(|| {
        format!("Failed to open {} timer store", config.storage.backend)
    })?;
    if let Ok(count) = store.count().await {
        metrics::set_timer_count(count);
    }

    let server = TimerServer::new(config.server.clone(), store, config.ticker.interval())
        .context("Failed to create timer server")?;

    println!("{}", server.info().display());
    println!();
    println!("API Endpoints:");
    println!("  GET    /api/health            - Health check");
    println!("  GET    /metrics               - Prometheus metrics endpoint");
    println!("  GET    /api/timers            - List timers (?sort=&limit=)");
    println!("  POST   /api/timers            - Create timer");
    println!("  GET    /api/timers/recent     - Five most recently updated");
    println!("  GET    /api/timers/{{pseudo}}   - Get timer by pseudo");
    println!("  GET    /api/timers/id/{{id}}    - Get timer by id");
    println!("  PUT    /api/timers/{{id}}       - Update timer");
    println!("  DELETE /api/timers/{{id}}       - Delete timer");
    println!();
    println!(
        "Timer server listening on http://{}",
        config.server.bind_address
    );
    println!("Press Ctrl+C to stop.\n");

    // Start with graceful shutdown
    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Timer server stopped.");
    Ok(())
}
