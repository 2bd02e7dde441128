//! # reworkd-server
//!
//! HTTP API and configuration for reworkd.
//!
//! This crate provides:
//! - Configuration loading (defaults, YAML file, environment overrides)
//! - The HTTP JSON API: station queries and trigger attempts

pub mod config;
pub mod error;
pub mod http;

pub use config::{Config, ConfigError, NetworkConfig, NotifyConfig, StationConfig, StorageConfig};
pub use error::ServerError;
pub use http::run_http_server;
