//! Component graph wiring for the `trustflow` binary.

mod config;

pub use config::{ConfigError, NodeConfig};
