use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, register_int_counter_vec};

/// Probes served by module and outcome, on the exporter's own registry.
pub static PROBES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "sonde_probes_total",
        "probe requests served, by module and outcome",
        &["module", "outcome"]
    )
    .unwrap()
});

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_BAD_REQUEST: &str = "bad_request";
pub const OUTCOME_FETCH_ERROR: &str = "fetch_error";
pub const OUTCOME_PIPELINE_ERROR: &str = "pipeline_error";
