//! Configuration module for exitline
//!
//! This module provides configuration types and loading utilities.
//!
//! # Example
//!
//! ```no_run
//! use exitline::config::{load_config, Config};
//!
//! let config = load_config("/etc/exitline/config.json").unwrap();
//! println!("Observers: {}", config.observers.len());
//! ```

mod loader;
mod types;

pub use loader::{create_default_config, load_config, load_config_str, load_config_with_env};
pub use types::{
    Config, ControllerConfig, FailoverConfig, LogConfig, ObserverConfig, PoolConfig, RegionEntry,
};
