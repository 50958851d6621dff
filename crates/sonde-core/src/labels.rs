use std::collections::HashMap;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use sonde_model::Query;

use crate::coerce::to_label_value;
use crate::error::PipelineError;
use crate::evaluate::evaluate;

/// Evaluate a metric's label queries against one fanned-out element and
/// assemble the canonical label string.
///
/// Each label query runs with fallback enabled, so a structurally failing
/// query degrades to its own literal text instead of aborting the metric.
/// Pairs are formatted as `name="escaped"` and sorted by the full formatted
/// pair; the result is stable for a given logical label set no matter how the
/// input map iterates. Only compile errors (and cancellation) propagate.
pub fn build_labels(
    labels: &HashMap<String, Query>,
    value: &Value,
    cancel: &CancellationToken,
) -> Result<String, PipelineError> {
    let mut pairs = Vec::with_capacity(labels.len());
    for (name, query) in labels {
        let result = evaluate(query, value, cancel, true)?;
        let escaped = escape_label_value(&to_label_value(&result));
        pairs.push(format!("{name}=\"{escaped}\""));
    }
    pairs.sort();
    Ok(pairs.join(","))
}

/// Prometheus label-value escaping: backslash, double quote and newline.
fn escape_label_value(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[test]
    fn output_is_invariant_under_map_order() {
        let value = json!({"name": "a", "zone": "eu"});

        let mut forward = HashMap::new();
        forward.insert("machine".to_string(), ".name".to_string());
        forward.insert("zone".to_string(), ".zone".to_string());

        let mut reverse = HashMap::new();
        reverse.insert("zone".to_string(), ".zone".to_string());
        reverse.insert("machine".to_string(), ".name".to_string());

        let a = build_labels(&forward, &value, &token()).unwrap();
        let b = build_labels(&reverse, &value, &token()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, r#"machine="a",zone="eu""#);
    }

    #[test]
    fn failing_label_query_degrades_to_literal() {
        let labels = HashMap::from([("machine".to_string(), "west_1".to_string())]);
        let out = build_labels(&labels, &json!({}), &token()).unwrap();
        assert_eq!(out, r#"machine="west_1""#);
    }

    #[test]
    fn compile_error_propagates() {
        let labels = HashMap::from([("machine".to_string(), ".foo[".to_string())]);
        let err = build_labels(&labels, &json!({}), &token()).unwrap_err();
        assert!(matches!(err, PipelineError::Compile { .. }));
    }

    #[test]
    fn escapes_quotes_backslashes_and_newlines() {
        let labels = HashMap::from([("raw".to_string(), ".v".to_string())]);
        let out = build_labels(&labels, &json!({"v": "a\"b\\c\nd"}), &token()).unwrap();
        assert_eq!(out, "raw=\"a\\\"b\\\\c\\nd\"");
    }

    #[test]
    fn empty_map_yields_empty_string() {
        let out = build_labels(&HashMap::new(), &json!({}), &token()).unwrap();
        assert_eq!(out, "");
    }
}
