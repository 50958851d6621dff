use serde_json::Value;

use crate::error::PipelineError;

/// Coerce a query result into an absolute counter value.
///
/// Unsigned integers coerce directly; everything else goes through its
/// canonical string form and a base-10 unsigned parse, so `"7"` is accepted
/// while negative numbers, floats and non-numeric strings are rejected.
pub fn to_counter_value(value: &Value) -> Result<u64, PipelineError> {
    if let Value::Number(n) = value
        && let Some(u) = n.as_u64()
    {
        return Ok(u);
    }
    let raw = render_scalar(value);
    raw.parse::<u64>()
        .map_err(|_| PipelineError::CounterValue { value: raw })
}

/// Coerce a query result into a gauge value.
///
/// Numbers coerce directly; everything else goes through its canonical string
/// form and a float parse.
pub fn to_gauge_value(value: &Value) -> Result<f64, PipelineError> {
    if let Value::Number(n) = value
        && let Some(f) = n.as_f64()
    {
        return Ok(f);
    }
    let raw = render_scalar(value);
    raw.parse::<f64>()
        .map_err(|_| PipelineError::GaugeValue { value: raw })
}

/// Render a query result as Prometheus label text. Never fails: any JSON
/// value has a label form.
pub fn to_label_value(value: &Value) -> String {
    render_scalar(value)
}

/// Canonical default string form of a value: strings verbatim, numbers in
/// their natural decimal form, booleans as `true`/`false`, null as `null`,
/// composites as compact JSON.
pub(crate) fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
