//! # Configuration
//!
//! Client configuration for the sync engine and CLI: server endpoint,
//! credential, paging and reconnect tuning.

pub mod client;

pub use client::{Config, ConfigError};
