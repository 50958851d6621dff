use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use sonde_model::{MetricSpec, Module};

use crate::coerce::{render_scalar, to_counter_value, to_gauge_value};
use crate::error::PipelineError;
use crate::evaluate::{evaluate, evaluate_stream};
use crate::labels::build_labels;
use crate::sink::MetricSink;

/// Run every metric definition of `module` against one retrieved document.
///
/// Definitions run in declaration order; the first error aborts the whole
/// probe and nothing further is written to the sink.
pub fn process_module(
    module: &Module,
    document: &Value,
    sink: &dyn MetricSink,
    cancel: &CancellationToken,
) -> Result<(), PipelineError> {
    for metric in &module.metrics {
        for element in select(metric, document, cancel)? {
            emit_metric(metric, &element, sink, cancel)?;
        }
    }
    Ok(())
}

/// Resolve a definition's fan-out elements.
///
/// No selection query means the whole document. A selection stream with
/// several outputs fans out over the outputs themselves; a single output fans
/// out over its elements when it is an array; zero outputs select nothing.
fn select(
    metric: &MetricSpec,
    document: &Value,
    cancel: &CancellationToken,
) -> Result<Vec<Value>, PipelineError> {
    if metric.query.is_empty() {
        return Ok(fan_out(document.clone()));
    }

    let mut outputs = evaluate_stream(&metric.query, document, cancel)?;
    match outputs.len() {
        0 => {
            debug!(query = %metric.query, "selection query matched nothing");
            Ok(Vec::new())
        }
        1 => Ok(fan_out(outputs.remove(0))),
        _ => Ok(outputs),
    }
}

/// A bare scalar is a one-element sequence; an array is iterated element-wise.
fn fan_out(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Synthesize and emit one sample for one fanned-out element.
fn emit_metric(
    metric: &MetricSpec,
    element: &Value,
    sink: &dyn MetricSink,
    cancel: &CancellationToken,
) -> Result<(), PipelineError> {
    let name = render_scalar(&evaluate(&metric.name, element, cancel, true)?);
    let labels = build_labels(&metric.labels, element, cancel)?;
    let identity = format!("{name}{{{labels}}}");

    // Value queries never fall back to their literal text.
    let value = evaluate(&metric.value, element, cancel, false)?;

    match metric.value_type.as_str() {
        "counter" => sink.set_counter(&identity, to_counter_value(&value)?),
        "gauge" => sink.set_gauge(&identity, to_gauge_value(&value)?),
        other => return Err(PipelineError::UnsupportedKind(other.to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    /// Records every write so tests can assert exact emission order.
    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<(String, String, f64)>>,
    }

    impl RecordingSink {
        fn writes(&self) -> Vec<(String, String, f64)> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl MetricSink for RecordingSink {
        fn set_counter(&self, identity: &str, value: u64) {
            self.writes
                .lock()
                .unwrap()
                .push(("counter".into(), identity.into(), value as f64));
        }

        fn set_gauge(&self, identity: &str, value: f64) {
            self.writes
                .lock()
                .unwrap()
                .push(("gauge".into(), identity.into(), value));
        }
    }

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    fn peers_metric(selection: &str, value_type: &str) -> MetricSpec {
        MetricSpec {
            query: selection.to_string(),
            name: r#""rx_bytes""#.to_string(),
            labels: HashMap::from([("machine".to_string(), "@.name".to_string())]),
            value_type: value_type.to_string(),
            value: "@.rx".to_string(),
        }
    }

    fn module_of(metrics: Vec<MetricSpec>) -> Module {
        Module {
            metrics,
            ..Module::default()
        }
    }

    const PEERS: &str = r#"{"peers":[{"name":"a","rx":10},{"name":"b","rx":0}]}"#;

    #[test]
    fn selection_stream_fans_out_per_element() {
        let document: Value = serde_json::from_str(PEERS).unwrap();
        let sink = RecordingSink::default();
        let module = module_of(vec![peers_metric(".peers[]", "gauge")]);

        process_module(&module, &document, &sink, &token()).unwrap();

        assert_eq!(
            sink.writes(),
            vec![
                ("gauge".into(), r#"rx_bytes{machine="a"}"#.into(), 10.0),
                ("gauge".into(), r#"rx_bytes{machine="b"}"#.into(), 0.0),
            ]
        );
    }

    #[test]
    fn array_selection_fans_out_per_element() {
        let document: Value = serde_json::from_str(PEERS).unwrap();
        let sink = RecordingSink::default();
        let module = module_of(vec![peers_metric(".peers", "gauge")]);

        process_module(&module, &document, &sink, &token()).unwrap();
        assert_eq!(sink.writes().len(), 2);
    }

    #[test]
    fn scalar_selection_emits_once() {
        let document = json!({"peers": [1, 2, 3]});
        let sink = RecordingSink::default();
        let module = module_of(vec![MetricSpec {
            query: ".peers | length".to_string(),
            name: "peer_count".to_string(),
            labels: HashMap::new(),
            value_type: "gauge".to_string(),
            value: ".".to_string(),
        }]);

        process_module(&module, &document, &sink, &token()).unwrap();
        assert_eq!(sink.writes(), vec![("gauge".into(), "peer_count{}".into(), 3.0)]);
    }

    #[test]
    fn empty_selection_processes_whole_document() {
        let document = json!({"up": 1});
        let sink = RecordingSink::default();
        let module = module_of(vec![MetricSpec {
            query: String::new(),
            name: "up".to_string(),
            labels: HashMap::new(),
            value_type: "counter".to_string(),
            value: ".up".to_string(),
        }]);

        process_module(&module, &document, &sink, &token()).unwrap();
        assert_eq!(sink.writes(), vec![("counter".into(), "up{}".into(), 1.0)]);
    }

    #[test]
    fn unsupported_kind_aborts_with_no_writes() {
        let document: Value = serde_json::from_str(PEERS).unwrap();
        let sink = RecordingSink::default();
        let module = module_of(vec![peers_metric(".peers[]", "histogram")]);

        let err = process_module(&module, &document, &sink, &token()).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedKind(kind) if kind == "histogram"));
        assert!(sink.writes().is_empty());
    }

    #[test]
    fn counter_coercion_failure_aborts_whole_module() {
        let document = json!({"reading": "12.5", "up": 1});
        let sink = RecordingSink::default();
        let module = module_of(vec![
            MetricSpec {
                query: String::new(),
                name: "reading".to_string(),
                labels: HashMap::new(),
                value_type: "counter".to_string(),
                value: ".reading".to_string(),
            },
            MetricSpec {
                query: String::new(),
                name: "up".to_string(),
                labels: HashMap::new(),
                value_type: "gauge".to_string(),
                value: ".up".to_string(),
            },
        ]);

        let err = process_module(&module, &document, &sink, &token()).unwrap_err();
        assert!(matches!(err, PipelineError::CounterValue { value } if value == "12.5"));
        assert!(sink.writes().is_empty());
    }

    #[test]
    fn value_query_failure_is_not_defaulted() {
        let document = json!({"peers": [{"name": "a"}]});
        let sink = RecordingSink::default();
        let module = module_of(vec![MetricSpec {
            query: ".peers[]".to_string(),
            name: "rx".to_string(),
            labels: HashMap::new(),
            value_type: "gauge".to_string(),
            value: "error(\"no reading\")".to_string(),
        }]);

        let err = process_module(&module, &document, &sink, &token()).unwrap_err();
        assert!(matches!(err, PipelineError::Query { .. }));
        assert!(sink.writes().is_empty());
    }

    #[test]
    fn cancelled_token_aborts_processing() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let document: Value = serde_json::from_str(PEERS).unwrap();
        let sink = RecordingSink::default();
        let module = module_of(vec![peers_metric(".peers[]", "gauge")]);

        let err = process_module(&module, &document, &sink, &cancel).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert!(sink.writes().is_empty());
    }

    #[test]
    fn bare_name_degrades_to_literal_identity() {
        let document = json!({"rx": 7});
        let sink = RecordingSink::default();
        let module = module_of(vec![MetricSpec {
            query: String::new(),
            name: "rx_bytes".to_string(),
            labels: HashMap::new(),
            value_type: "counter".to_string(),
            value: ".rx".to_string(),
        }]);

        process_module(&module, &document, &sink, &token()).unwrap();
        assert_eq!(sink.writes(), vec![("counter".into(), "rx_bytes{}".into(), 7.0)]);
    }
}
