use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use sonde_query::{End, EvalError};

use crate::error::PipelineError;

/// Evaluate one query against `input`, keeping the **last** emitted output.
///
/// A filter may emit many outputs; the last one wins, mirroring
/// last-assignment semantics. A `halt` mid-stream keeps whatever was emitted
/// before it. Zero outputs evaluate to null.
///
/// With `fallback` set, a runtime fault degrades to the query text itself as
/// a string constant, which is what lets a bare word like `rx_bytes` stand in
/// for a query. Compile errors and cancellation are never suppressed.
pub fn evaluate(
    query: &str,
    input: &Value,
    cancel: &CancellationToken,
    fallback: bool,
) -> Result<Value, PipelineError> {
    let outcome = run(query, input, cancel)?;
    match outcome.end {
        End::Finished | End::Halted => Ok(last(outcome.outputs)),
        End::Failed(EvalError::Cancelled) => Err(PipelineError::Cancelled),
        End::Failed(source) if fallback => {
            trace!(query, %source, "query failed, falling back to literal text");
            Ok(Value::String(query.to_string()))
        }
        End::Failed(source) => Err(PipelineError::Query {
            query: query.to_string(),
            source,
        }),
    }
}

/// Evaluate one query and keep the **whole** output stream.
///
/// Used for selection queries, where every output becomes a fan-out element.
/// A `halt` keeps the outputs emitted before it; runtime faults are always
/// propagated (selection has no fallback).
pub(crate) fn evaluate_stream(
    query: &str,
    input: &Value,
    cancel: &CancellationToken,
) -> Result<Vec<Value>, PipelineError> {
    let outcome = run(query, input, cancel)?;
    match outcome.end {
        End::Finished | End::Halted => Ok(outcome.outputs),
        End::Failed(EvalError::Cancelled) => Err(PipelineError::Cancelled),
        End::Failed(source) => Err(PipelineError::Query {
            query: query.to_string(),
            source,
        }),
    }
}

fn run(
    query: &str,
    input: &Value,
    cancel: &CancellationToken,
) -> Result<sonde_query::Outcome, PipelineError> {
    let filter = sonde_query::compile(query).map_err(|source| PipelineError::Compile {
        query: query.to_string(),
        source,
    })?;
    Ok(filter.run(input, cancel))
}

fn last(outputs: Vec<Value>) -> Value {
    outputs.into_iter().next_back().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[test]
    fn keeps_last_output() {
        let result = evaluate(".a, .b", &json!({"a": 1, "b": 2}), &token(), false).unwrap();
        assert_eq!(result, json!(2));
    }

    #[test]
    fn zero_outputs_evaluate_to_null() {
        let result = evaluate("empty", &json!({}), &token(), false).unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn halt_keeps_last_prior_output() {
        let result = evaluate(".a, .b, halt, .c", &json!({"a": 1, "b": 2, "c": 3}), &token(), false)
            .unwrap();
        assert_eq!(result, json!(2));
    }

    #[test]
    fn fallback_substitutes_query_text() {
        let result = evaluate("rx_bytes", &Value::Null, &token(), true).unwrap();
        assert_eq!(result, json!("rx_bytes"));
    }

    #[test]
    fn runtime_fault_propagates_without_fallback() {
        let err = evaluate("rx_bytes", &Value::Null, &token(), false).unwrap_err();
        assert!(matches!(err, PipelineError::Query { .. }));
    }

    #[test]
    fn compile_error_ignores_fallback() {
        let err = evaluate(".foo[", &Value::Null, &token(), true).unwrap_err();
        assert!(matches!(err, PipelineError::Compile { .. }));
    }

    #[test]
    fn cancellation_ignores_fallback() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = evaluate(".a", &json!({"a": 1}), &cancel, true).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[test]
    fn stream_keeps_all_outputs() {
        let outputs =
            evaluate_stream(".peers[]", &json!({"peers": [1, 2]}), &token()).unwrap();
        assert_eq!(outputs, vec![json!(1), json!(2)]);
    }
}
