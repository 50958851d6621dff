use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A filter expression in the query language understood by `sonde-query`.
///
/// Queries are opaque strings at the configuration layer; they are not
/// validated until a probe actually evaluates them.
pub type Query = String;

/// One named configuration unit: retrieval parameters plus the metric
/// definitions synthesized from the retrieved document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    /// Metric definitions, evaluated in declaration order.
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    /// Headers set on the outbound retrieval request.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Optional outbound request body template.
    #[serde(default)]
    pub body: BodySpec,
}

/// Template for the outbound request body.
///
/// `{{param}}` placeholders are substituted from the probe request's query
/// parameters. An empty content means no body is sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodySpec {
    #[serde(default)]
    pub content: String,
}

/// Declaration of a single synthesized metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Optional selection query narrowing the document before fan-out.
    ///
    /// Empty means the whole retrieved document is processed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: Query,
    /// Query producing the metric name (a bare literal degrades to itself).
    pub name: Query,
    /// Label name -> query, evaluated per fanned-out element.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, Query>,
    /// Declared metric kind.
    ///
    /// Kept as a free string so that an unsupported kind is rejected at
    /// probe time rather than at config parse time.
    #[serde(rename = "valueType")]
    pub value_type: String,
    /// Query producing the sample value.
    pub value: Query,
}
