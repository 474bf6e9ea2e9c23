//! Network infrastructure for the server.
//!
//! # Sub-modules
//!
//! - **`source_manager`** – Owns one listening/connected TCP socket and one
//!   frame decoder per configured port.  Accepts clients, feeds their bytes
//!   through the decoder, hands completed set-pixels frames to a
//!   [`PixelHandler`](crate::application::PixelHandler), and re-listens when a
//!   client goes away.

pub mod source_manager;

pub use source_manager::{
    PollOutcome, SourceError, SourceId, SourceManager, SourceManagerConfig, SourceStatus,
};
