//! Prometheus-facing metric storage for the sonde exporter.
//!
//! [`ProbeRegistry`] is the process-wide series store the synthesis pipeline
//! writes into. It is keyed by the full metric identity string
//! (`name{label="value",...}`), the same way the pipeline composes it, and
//! renders the standard text exposition format.
//!
//! The exporter's *own* metrics (probe counters, process stats) live on the
//! `prometheus` crate's default registry instead; the encoder types are
//! re-exported here for the `/metrics` endpoint.

mod registry;
pub use registry::ProbeRegistry;

pub use prometheus::{Encoder, TextEncoder};
