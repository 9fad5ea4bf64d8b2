//! Streaming compression relay.
//!
//! # Architecture Overview
//!
//! ```text
//!   PUT /compressions ──▶ http ──▶ relay::ProducerIntake ──▶ encoder ──┐
//!                                                                      │ stream handle
//!                                        relay::AdmissionQueue ◀───────┘ (read end)
//!                                                │
//!   GET /compressions ◀── http ◀── relay::ConsumerDispatch
//!
//!   raw TCP peer ──▶ net::RawCompressor ──▶ encoder ──▶ same peer
//! ```
//!
//! Cross-cutting: config (TOML + CLI overrides), observability (tracing,
//! Prometheus), lifecycle (signal driven drain).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use compression_relay::config::{load_config, validate_config, ConfigError, RelayConfig};
use compression_relay::lifecycle::signals::watch_signals;
use compression_relay::net::Listener;
use compression_relay::observability::{logging, metrics};
use compression_relay::{HttpServer, RawCompressor, Relay, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "compression-relay", version, about = "Streaming zstd compression relay")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP bind address (overrides listener.bind_address)
    #[arg(long)]
    bind: Option<String>,

    /// Raw socket bind address (overrides raw.bind_address)
    #[arg(long)]
    raw_bind: Option<String>,

    /// Admission queue capacity (overrides relay.queue_capacity)
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Disable the raw socket listener
    #[arg(long)]
    no_raw: bool,
}

impl Args {
    fn load(&self) -> Result<RelayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => RelayConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(raw_bind) = &self.raw_bind {
            config.raw.bind_address = raw_bind.clone();
        }
        if let Some(capacity) = self.queue_capacity {
            config.relay.queue_capacity = capacity;
        }
        if self.no_raw {
            config.raw.enabled = false;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.load()?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "compression-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        raw_enabled = config.raw.enabled,
        raw_bind_address = %config.raw.bind_address,
        queue_capacity = config.relay.queue_capacity,
        codec_level = config.codec.level,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let relay = Relay::from_config(&config);
    let tracker = relay.tracker().clone();

    let raw_task = if config.raw.enabled {
        let listener = Listener::bind(&config.raw.bind_address, config.raw.max_connections).await?;
        let raw = RawCompressor::new(listener, relay.codec(), tracker.clone());
        Some(tokio::spawn(raw.run(shutdown.subscribe())))
    } else {
        None
    };

    let http_listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(relay, shutdown.subscribe());

    let serve = async {
        server.run(http_listener).await?;
        if let Some(task) = raw_task {
            task.await??;
        }
        tracker.wait_idle().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    };

    let drain_timeout = Duration::from_secs(config.lifecycle.drain_timeout_secs);
    tokio::select! {
        result = serve => result?,
        () = watch_signals(&shutdown, drain_timeout) => {
            tracing::warn!(
                active_transfers = tracker.active_count(),
                "Exiting with transfers in flight"
            );
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
