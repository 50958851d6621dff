use std::sync::Arc;
use std::time::Duration;

use sonde_model::Config;
use sonde_prometheus::ProbeRegistry;

use crate::fetch::Fetch;

/// Shared state of the daemon: immutable config, the process-wide series
/// registry and the retrieval client.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ProbeRegistry>,
    pub fetcher: Arc<dyn Fetch>,
    pub probe_timeout: Duration,
}
