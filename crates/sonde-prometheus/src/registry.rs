use std::collections::BTreeMap;
use std::sync::RwLock;

use sonde_core::MetricSink;

#[derive(Debug, Clone, Copy)]
enum Sample {
    Counter(u64),
    Gauge(f64),
}

impl Sample {
    fn kind(self) -> &'static str {
        match self {
            Sample::Counter(_) => "counter",
            Sample::Gauge(_) => "gauge",
        }
    }
}

/// Identity-keyed counter/gauge store.
///
/// Writes are idempotent absolute-value sets: a repeated probe overwrites the
/// last observed sample for the same identity. Series persist for the
/// lifetime of the process, so successive probes of the same module keep
/// updating the same series.
#[derive(Debug)]
pub struct ProbeRegistry {
    expose_metadata: bool,
    series: RwLock<BTreeMap<String, Sample>>,
}

impl ProbeRegistry {
    /// Create an empty registry. With `expose_metadata` set, [`render`]
    /// prefixes each metric family with a `# TYPE` line.
    ///
    /// [`render`]: ProbeRegistry::render
    pub fn new(expose_metadata: bool) -> Self {
        Self {
            expose_metadata,
            series: RwLock::new(BTreeMap::new()),
        }
    }

    /// Render all series in the Prometheus text exposition format.
    ///
    /// Series are ordered by identity, which groups families together and
    /// keeps the output deterministic.
    pub fn render(&self) -> String {
        let series = self.series.read().unwrap();
        let mut out = String::new();
        let mut last_family = "";

        for (identity, sample) in series.iter() {
            let family = family_of(identity);
            if self.expose_metadata && family != last_family {
                out.push_str(&format!("# TYPE {family} {}\n", sample.kind()));
            }
            last_family = family;

            match sample {
                Sample::Counter(v) => out.push_str(&format!("{identity} {v}\n")),
                Sample::Gauge(v) => out.push_str(&format!("{identity} {v}\n")),
            }
        }
        out
    }
}

impl MetricSink for ProbeRegistry {
    fn set_counter(&self, identity: &str, value: u64) {
        let mut series = self.series.write().unwrap();
        series.insert(identity.to_string(), Sample::Counter(value));
    }

    fn set_gauge(&self, identity: &str, value: f64) {
        let mut series = self.series.write().unwrap();
        series.insert(identity.to_string(), Sample::Gauge(value));
    }
}

/// The bare metric name of an identity, without its label block.
fn family_of(identity: &str) -> &str {
    identity.split_once('{').map_or(identity, |(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_series_in_identity_order() {
        let registry = ProbeRegistry::new(false);
        registry.set_gauge(r#"rx_bytes{machine="b"}"#, 0.0);
        registry.set_gauge(r#"rx_bytes{machine="a"}"#, 10.0);

        assert_eq!(
            registry.render(),
            "rx_bytes{machine=\"a\"} 10\nrx_bytes{machine=\"b\"} 0\n"
        );
    }

    #[test]
    fn repeated_sets_overwrite() {
        let registry = ProbeRegistry::new(false);
        registry.set_counter("hits{}", 1);
        registry.set_counter("hits{}", 5);

        assert_eq!(registry.render(), "hits{} 5\n");
    }

    #[test]
    fn metadata_groups_families() {
        let registry = ProbeRegistry::new(true);
        registry.set_counter(r#"hits{path="/a"}"#, 1);
        registry.set_counter(r#"hits{path="/b"}"#, 2);
        registry.set_gauge("temp{}", 21.5);

        assert_eq!(
            registry.render(),
            "# TYPE hits counter\n\
             hits{path=\"/a\"} 1\n\
             hits{path=\"/b\"} 2\n\
             # TYPE temp gauge\n\
             temp{} 21.5\n"
        );
    }

    #[test]
    fn integral_gauges_render_without_fraction() {
        let registry = ProbeRegistry::new(false);
        registry.set_gauge("up{}", 1.0);

        assert_eq!(registry.render(), "up{} 1\n");
    }
}
