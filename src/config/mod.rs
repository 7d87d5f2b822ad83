//! Configuration
//!
//! Typical usage: start from [`Config::default`], load a config file over
//! it, then apply command-line overrides from the host daemon.

mod loader;
mod types;

pub use loader::{load_config, load_config_str, load_config_with_overrides};
pub use types::{Config, LogDest, PROTOCOL_VERSION};
