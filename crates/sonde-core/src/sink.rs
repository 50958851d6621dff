/// Write side of the metric registry the pipeline emits into.
///
/// Implementations are keyed by the full metric identity (`name{labels}`) and
/// must be safe under concurrent probes. Both operations are idempotent
/// absolute-value sets: repeated probes overwrite the last observed value.
pub trait MetricSink: Send + Sync {
    fn set_counter(&self, identity: &str, value: u64);

    fn set_gauge(&self, identity: &str, value: f64);
}
