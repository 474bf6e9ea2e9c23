//! Infrastructure layer for tcl-server.
//!
//! Everything that touches the operating system lives here: TCP sockets,
//! the SPI device, the configuration file, and the log sinks.

pub mod device;
pub mod logging;
pub mod network;
pub mod storage;
