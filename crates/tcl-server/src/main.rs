//! TCL server entry point.
//!
//! Listens for Open Pixel Control clients and drives a Total Control Lighting
//! strand attached to an SPI bus.
//!
//! # Usage
//!
//! ```text
//! tcl-server [OPTIONS]
//!
//! Options:
//!   -p, --port <PORT>        OPC listening port, repeatable [default: 7890]
//!   -s, --speed <HZ>         SPI clock speed in Hz [default: 8000000]
//!   -g, --gamma <GAMMA>      Gamma exponent for all channels [default: 1.0]
//!       --device <PATH>      SPI device node [default: /dev/spidev1.0]
//!       --bind <ADDR>        Bind address [default: 0.0.0.0]
//!       --timeout-ms <MS>    Poll timeout [default: 10000]
//!       --log-level <LEVEL>  Log level [default: info]
//!       --log-dir <DIR>      Rolling log file directory [default: logs]
//!       --no-log-file        Log to the console only
//!   -c, --config <PATH>      TOML configuration file
//! ```
//!
//! Flags override the configuration file, which overrides the built-in
//! defaults.
//!
//! # Environment variable overrides
//!
//! | Variable        | Flag            |
//! |-----------------|-----------------|
//! | `TCL_CONFIG`    | `--config`      |
//! | `TCL_PORTS`     | `--port` (comma separated) |
//! | `TCL_SPEED_HZ`  | `--speed`       |
//! | `TCL_GAMMA`     | `--gamma`       |
//! | `TCL_DEVICE`    | `--device`      |
//! | `TCL_BIND`      | `--bind`        |
//! | `TCL_TIMEOUT_MS`| `--timeout-ms`  |
//! | `TCL_LOG_LEVEL` | `--log-level`   |
//! | `TCL_LOG_DIR`   | `--log-dir`     |
//!
//! # Exit status
//!
//! Non-zero when the device cannot be opened, when no source can be
//! registered, or when a device write fails.  Ctrl+C exits with status 0
//! after the diagnostic pixel is written.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use opc_core::WireEncoder;
use tcl_server::application::PixelOutput;
use tcl_server::domain::ServerConfig;
use tcl_server::infrastructure::device::SpiDevice;
use tcl_server::infrastructure::logging;
use tcl_server::infrastructure::network::{
    SourceError, SourceManager, SourceManagerConfig,
};
use tcl_server::infrastructure::storage::load_config;

/// Pause after a poll error before polling again.
const ERROR_BACKOFF: Duration = Duration::from_millis(500);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Open Pixel Control server for Total Control Lighting strands.
#[derive(Debug, Parser)]
#[command(name = "tcl-server", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "TCL_CONFIG")]
    config: Option<PathBuf>,

    /// OPC listening port.  Repeat for several sources.
    #[arg(short, long = "port", env = "TCL_PORTS", value_delimiter = ',')]
    ports: Vec<u16>,

    /// SPI clock speed in hertz.
    #[arg(short, long, env = "TCL_SPEED_HZ")]
    speed: Option<u32>,

    /// Gamma exponent applied to all three channels.
    #[arg(short, long, env = "TCL_GAMMA")]
    gamma: Option<f64>,

    /// SPI device node.
    #[arg(long, env = "TCL_DEVICE")]
    device: Option<PathBuf>,

    /// Address the listening sockets bind to.
    #[arg(long, env = "TCL_BIND")]
    bind: Option<IpAddr>,

    /// How long each poll waits for activity, in milliseconds.
    #[arg(long, env = "TCL_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Log level: error, warn, info, debug or trace.  `RUST_LOG` wins.
    #[arg(long, env = "TCL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for the rolling log file.
    #[arg(long, env = "TCL_LOG_DIR", conflicts_with = "no_log_file")]
    log_dir: Option<PathBuf>,

    /// Log to the console only.
    #[arg(long)]
    no_log_file: bool,
}

impl Cli {
    /// Loads the configuration file (if any) and applies the flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.  Flag
    /// values are taken as parsed; gamma exponents are not range-checked.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if !self.ports.is_empty() {
            config.network.ports = self.ports;
        }
        if let Some(bind) = self.bind {
            config.network.bind_address = bind;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.network.poll_timeout_ms = timeout_ms;
        }
        if let Some(speed) = self.speed {
            config.device.speed_hz = speed;
        }
        if let Some(device) = self.device {
            config.device.path = device;
        }
        if let Some(gamma) = self.gamma {
            config.output.set_uniform_gamma(gamma);
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if let Some(dir) = self.log_dir {
            config.log.directory = Some(dir);
        }
        if self.no_log_file {
            config.log.directory = None;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// Everything runs on one thread: all sources are watched together and each
/// completed frame is written to the device before the next poll.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_server_config()?;

    let _log_guard = logging::init(&config.log)?;
    info!("tcl-server {} starting", env!("CARGO_PKG_VERSION"));

    run(config).await
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let device = SpiDevice::open(&config.device.path, config.device.speed_hz)
        .with_context(|| format!("failed to open SPI device {}", config.device.path.display()))?;
    let encoder = WireEncoder::new(config.output.gamma_table(), config.output.color_order);
    info!(
        gamma_red = config.output.gamma_red,
        gamma_green = config.output.gamma_green,
        gamma_blue = config.output.gamma_blue,
        color_order = ?config.output.color_order,
        "output ready"
    );
    let mut output = PixelOutput::new(device, encoder, config.output.frame_report_interval);

    let mut sources = SourceManager::new(SourceManagerConfig::from(&config.network));
    for &port in &config.network.ports {
        if let Err(e) = sources.register(port) {
            error!("could not register source on port {port}: {e}");
        }
    }
    if sources.is_empty() {
        output
            .write_diagnostic(SystemTime::now())
            .context("failed to write diagnostic pixel")?;
        anyhow::bail!("no OPC source could be registered");
    }

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── Polling loop ───────────────────────────────────────────────────────────
    let timeout = config.network.poll_timeout();
    while running.load(Ordering::Relaxed) {
        match sources.poll_next(&mut output, timeout).await {
            Ok(Some(_)) => {}
            Ok(None) => info!("no activity on any source for {} ms", timeout.as_millis()),
            Err(e @ SourceError::Handler(_)) => {
                return Err(anyhow::Error::new(e).context("pixel output failed"));
            }
            Err(e) => {
                warn!("{e}");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }

    output
        .write_diagnostic(SystemTime::now())
        .context("failed to write diagnostic pixel")?;
    info!(frames = output.frames(), "tcl-server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
