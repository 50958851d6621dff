//! Logging initialization for sonde binaries.

mod config;
pub use config::{LogConfig, LogFormat};

mod error;
pub use error::LogError;

mod init;
pub use init::log_init;
