//! hlsforge - HLS adaptive-bitrate transcoding service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod transcode;
