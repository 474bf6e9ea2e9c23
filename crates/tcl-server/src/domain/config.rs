//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for runtime settings.  It
//! deserializes from TOML with every field defaulted, so an empty file (or no
//! file at all) yields a working configuration:
//!
//! ```toml
//! [network]
//! ports = [7890]
//! poll_timeout_ms = 10000
//!
//! [device]
//! path = "/dev/spidev1.0"
//! speed_hz = 8000000
//!
//! [output]
//! gamma_red = 2.2
//! gamma_green = 2.2
//! gamma_blue = 2.2
//! color_order = "bgr"
//!
//! [log]
//! level = "info"
//! directory = "logs"
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use opc_core::protocol::frame::DEFAULT_PORT;
use opc_core::{ColorOrder, GammaTable};
use serde::{Deserialize, Serialize};

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Listening ports and polling behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// One OPC source is registered per port.
    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,
    /// Address all listening sockets bind to.  `0.0.0.0` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// Capacity of the source table.
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
    /// Pending-connection backlog for each listening socket.
    #[serde(default = "default_listen_backlog")]
    pub listen_backlog: u32,
    /// How long one poll waits for activity before reporting a timeout.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

/// The SPI device the strand is attached to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    #[serde(default = "default_device_path")]
    pub path: PathBuf,
    /// SPI clock speed in hertz.
    #[serde(default = "default_speed_hz")]
    pub speed_hz: u32,
}

/// Colour correction and output encoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_gamma")]
    pub gamma_red: f64,
    #[serde(default = "default_gamma")]
    pub gamma_green: f64,
    #[serde(default = "default_gamma")]
    pub gamma_blue: f64,
    #[serde(default)]
    pub color_order: ColorOrder,
    /// Log the running frame count every this many frames.  0 disables it.
    #[serde(default = "default_frame_report_interval")]
    pub frame_report_interval: u64,
}

/// `tracing` output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Default filter directive: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for the rolling log file; `None` logs to the console only.
    #[serde(default = "default_log_directory")]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
    /// Rotated files kept on disk.
    #[serde(default = "default_log_max_files")]
    pub max_files: usize,
}

impl NetworkConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl OutputConfig {
    /// Builds the gamma tables for the configured exponents.
    pub fn gamma_table(&self) -> GammaTable {
        GammaTable::new(self.gamma_red, self.gamma_green, self.gamma_blue)
    }

    /// Sets the same exponent on all three channels.
    pub fn set_uniform_gamma(&mut self, gamma: f64) {
        self.gamma_red = gamma;
        self.gamma_green = gamma;
        self.gamma_blue = gamma;
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_ports() -> Vec<u16> {
    vec![DEFAULT_PORT]
}
fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_max_sources() -> usize {
    4
}
fn default_listen_backlog() -> u32 {
    1
}
fn default_poll_timeout_ms() -> u64 {
    10_000
}
fn default_device_path() -> PathBuf {
    PathBuf::from("/dev/spidev1.0")
}
fn default_speed_hz() -> u32 {
    8_000_000
}
fn default_gamma() -> f64 {
    1.0
}
fn default_frame_report_interval() -> u64 {
    36_000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_directory() -> Option<PathBuf> {
    Some(PathBuf::from("logs"))
}
fn default_log_file_prefix() -> String {
    "tcl_server".to_string()
}
fn default_log_max_files() -> usize {
    3
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ports: default_ports(),
            bind_address: default_bind_address(),
            max_sources: default_max_sources(),
            listen_backlog: default_listen_backlog(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: default_device_path(),
            speed_hz: default_speed_hz(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            gamma_red: default_gamma(),
            gamma_green: default_gamma(),
            gamma_blue: default_gamma(),
            color_order: ColorOrder::default(),
            frame_report_interval: default_frame_report_interval(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_directory(),
            file_prefix: default_log_file_prefix(),
            max_files: default_log_max_files(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_opc_well_known_port() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.network.ports, vec![7890]);
    }

    #[test]
    fn test_default_bind_address_is_unspecified() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.network.bind_address.to_string(), "0.0.0.0");
    }

    #[test]
    fn test_default_poll_timeout_is_10s() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.network.poll_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_default_device_is_spidev_1_0() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.device.path, PathBuf::from("/dev/spidev1.0"));
        assert_eq!(cfg.device.speed_hz, 8_000_000);
    }

    #[test]
    fn test_default_gamma_is_identity() {
        let cfg = ServerConfig::default();
        assert!(cfg.output.gamma_table().is_identity());
        assert_eq!(cfg.output.color_order, ColorOrder::Bgr);
    }

    #[test]
    fn test_set_uniform_gamma_sets_all_channels() {
        let mut output = OutputConfig::default();
        output.set_uniform_gamma(2.2);
        assert_eq!(output.gamma_red, 2.2);
        assert_eq!(output.gamma_green, 2.2);
        assert_eq!(output.gamma_blue, 2.2);
        assert_eq!(output.gamma_table(), GammaTable::uniform(2.2));
    }

    #[test]
    fn test_default_log_writes_to_logs_directory() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.log.directory, Some(PathBuf::from("logs")));
        assert_eq!(cfg.log.max_files, 3);
    }
}
