//! Plexclip - clip extraction service for Plex libraries
//!
//! This library crate exposes the core functionality for integration testing.

pub mod clip;
pub mod config;
pub mod error;
pub mod plex;
pub mod probe;
pub mod server;
pub mod transcode;

pub use error::{Error, Result};
