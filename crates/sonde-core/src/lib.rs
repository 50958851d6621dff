//! Query-driven metric synthesis pipeline.
//!
//! Given one retrieved JSON document and a module's metric definitions, the
//! pipeline evaluates each definition's selection query, fans out over the
//! selected values, and per element evaluates the name, label and value
//! queries, coercing the results into counter/gauge samples written through a
//! [`MetricSink`].
//!
//! The pipeline is fail-fast per probe: the first error aborts the whole
//! module evaluation and is surfaced to the caller.

mod error;
pub use error::PipelineError;

mod sink;
pub use sink::MetricSink;

mod evaluate;
pub use evaluate::evaluate;

mod coerce;
pub use coerce::{to_counter_value, to_gauge_value, to_label_value};

mod labels;
pub use labels::build_labels;

mod pipeline;
pub use pipeline::process_module;
