//! Declarative configuration model for the sonde exporter.
//!
//! A config file declares named modules; each module bundles retrieval
//! parameters (headers, an optional body template) and a list of metric
//! definitions whose fields are filter queries evaluated at probe time.

mod config;
pub use config::Config;

mod module;
pub use module::{BodySpec, MetricSpec, Module, Query};

mod load;
pub use load::{ConfigError, expand_env, load_from_file, load_from_str};
