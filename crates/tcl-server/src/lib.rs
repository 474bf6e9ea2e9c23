//! tcl-server library crate.
//!
//! Accepts Open Pixel Control connections over TCP and drives a Total Control
//! Lighting strand on an SPI bus.
//!
//! # Architecture
//!
//! ```text
//! OPC client (TCP, port 7890)
//!         ↓
//! [tcl-server]
//!   ├── domain/           ServerConfig and its sections (plain data)
//!   ├── application/      PixelOutput: frame counting, gamma, encode, write
//!   └── infrastructure/
//!         ├── network/    SourceManager: listen, accept, read, decode, re-listen
//!         ├── device/     SPI device and the recording mock
//!         ├── storage/    TOML configuration file
//!         └── logging     tracing subscriber setup
//!         ↓
//! TCL strand (SPI)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `opc-core`; it reaches the device
//!   only through the [`application::PixelDevice`] trait.
//! - `infrastructure` depends on all other layers plus `tokio`.

/// Domain layer: configuration types.
pub mod domain;

/// Application layer: turning decoded pixels into device writes.
pub mod application;

/// Infrastructure layer: sockets, devices, files, logging.
pub mod infrastructure;
