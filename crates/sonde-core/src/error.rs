use thiserror::Error;

use sonde_query::{EvalError, ParseError};

/// Failure of one probe request's pipeline run.
///
/// Every variant is fatal to the enclosing probe: the orchestrator stops at
/// the first error and renders no metrics body for the request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The query text failed to compile. Never suppressed, regardless of the
    /// fallback setting.
    #[error("invalid query {query:?}: {source}")]
    Compile {
        query: String,
        #[source]
        source: ParseError,
    },

    /// The query failed at evaluation time and fallback was not requested.
    #[error("query {query:?} failed: {source}")]
    Query {
        query: String,
        #[source]
        source: EvalError,
    },

    /// The caller's cancellation token fired mid-evaluation.
    #[error("probe cancelled during query evaluation")]
    Cancelled,

    /// The value query's result is not a valid unsigned integer.
    #[error("cannot use {value:?} as a counter value")]
    CounterValue { value: String },

    /// The value query's result is not a valid float.
    #[error("cannot use {value:?} as a gauge value")]
    GaugeValue { value: String },

    /// A metric declares a kind other than `counter` or `gauge`.
    #[error("valueType {0:?} is not supported")]
    UnsupportedKind(String),
}
