mod config;
pub use config::{Config, MonitorSettings, Network, Programs};
