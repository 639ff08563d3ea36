// src/main.rs
//
// aquatap CLI — water-quality ingestion worker.
//
// # Usage
//
// ```bash
// # Run against the defaults (sensor on /dev/ttyUSB0, local collector)
// aquatap
//
// # Explicit port and collector, debug diagnostics
// aquatap --port /dev/ttyACM0 --url http://collector.local:8000 --verbose
//
// # Config file plus a log directory
// aquatap --config aquatap.toml --log-dir /var/log/aquatap
//
// # Show candidate serial ports
// aquatap --list-ports
// ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use aquatap::config::WorkerConfig;
use aquatap::io::serial;
use aquatap::worker::{self, WorkerExit};

#[derive(Parser)]
#[command(name = "aquatap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Water-quality ingestion worker - reads pH/TDS/turbidity over serial and forwards readings to the collector")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port the sensor is attached to (overrides config)
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate (overrides config)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Collector base URL (overrides config)
    #[arg(short, long)]
    url: Option<String>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Also write logs to a timestamped file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Verbose mode (debug-level diagnostics)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    aquatap::logging::init(cli.verbose, cli.log_dir.as_deref()).map_err(anyhow::Error::msg)?;

    if cli.list_ports {
        return print_ports();
    }

    let mut config = match &cli.config {
        Some(path) => WorkerConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => WorkerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.serial.port = port;
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(url) = cli.url {
        config.collector.base_url = url;
    }

    let stop = Arc::new(AtomicBool::new(false));
    ctrlc_handler(stop.clone());

    let exit = worker::run(&config, stop).context("ingestion worker failed to start")?;
    match exit {
        WorkerExit::Interrupted => tracing::info!("worker stopped by interrupt"),
        WorkerExit::BreakerTripped => {
            tracing::error!("worker stopped after sustained failures");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Print the available serial ports for `--list-ports`.
fn print_ports() -> Result<()> {
    let ports = serial::list_ports().context("port enumeration failed")?;

    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    for port in ports {
        let detail = match (port.manufacturer, port.product) {
            (Some(manufacturer), Some(product)) => format!(" ({} {})", manufacturer, product),
            (_, Some(product)) => format!(" ({})", product),
            (Some(manufacturer), None) => format!(" ({})", manufacturer),
            (None, None) => String::new(),
        };
        println!("{}  [{}]{}", port.name, port.port_type, detail);
    }

    Ok(())
}

/// Setup Ctrl+C handler.
fn ctrlc_handler(stop: Arc<AtomicBool>) {
    let _ = ctrlc::set_handler(move || {
        tracing::info!("received Ctrl+C, shutting down...");
        stop.store(true, Ordering::Relaxed);
    });
}
