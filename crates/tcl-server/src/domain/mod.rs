//! Domain layer for tcl-server.
//!
//! Plain configuration types with no I/O.  The infrastructure layer fills
//! them from a TOML file and command-line flags.

pub mod config;

pub use config::{DeviceConfig, LogConfig, NetworkConfig, OutputConfig, ServerConfig};
