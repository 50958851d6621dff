use std::collections::HashMap;

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tracing::{debug, error, warn};

use sonde_core::process_module;
use sonde_prometheus::{Encoder, TextEncoder};

use crate::body::render_body;
use crate::fetch::FetchError;
use crate::metrics::{self, PROBES_TOTAL};
use crate::state::AppState;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Build the daemon's router.
///
/// Routes:
/// - GET /metrics - the exporter's own metrics
/// - GET /probe?module=..&target=..[&method=..] - run one probe
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .route("/probe", get(handle_probe))
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// GET /metrics
async fn handle_metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("failed to encode self metrics: {e}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

/// GET /probe
///
/// A failed probe renders no metrics body at all; partial results are never
/// exposed. Earlier successful probes keep their series in the registry.
async fn handle_probe(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(module_name) = params.get("module") else {
        warn!("no module found in query");
        return bad_request("unknown");
    };
    let Some(module) = state.config.module(module_name) else {
        warn!(module = %module_name, "no module found in config");
        return bad_request(module_name);
    };
    let Some(target) = params.get("target") else {
        warn!(module = %module_name, "no target found in query");
        return bad_request(module_name);
    };
    let method = params.get("method").map_or("GET", String::as_str);

    debug!(module = %module_name, method, target, "start probe");

    // One token per probe; a watchdog enforces the deadline, the guard
    // releases the watchdog when the handler finishes.
    let cancel = CancellationToken::new();
    let _complete = cancel.clone().drop_guard();
    tokio::spawn({
        let cancel = cancel.clone();
        let timeout = state.probe_timeout;
        async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => cancel.cancel(),
                _ = cancel.cancelled() => {}
            }
        }
    });

    let body = render_body(&module.body.content, &params);
    let fetched = tokio::select! {
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        result = state.fetcher.retrieve(method, target, &module.headers, body) => result,
    };
    let document = match fetched {
        Ok(document) => document,
        Err(e) => {
            error!(module = %module_name, target, "fetch failed: {e}");
            PROBES_TOTAL
                .with_label_values(&[module_name, metrics::OUTCOME_FETCH_ERROR])
                .inc();
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    if let Err(e) = process_module(module, &document, state.registry.as_ref(), &cancel) {
        error!(module = %module_name, target, "probe failed: {e}");
        PROBES_TOTAL
            .with_label_values(&[module_name, metrics::OUTCOME_PIPELINE_ERROR])
            .inc();
        return StatusCode::BAD_GATEWAY.into_response();
    }

    PROBES_TOTAL
        .with_label_values(&[module_name, metrics::OUTCOME_SUCCESS])
        .inc();
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.registry.render(),
    )
        .into_response()
}

fn bad_request(module: &str) -> Response {
    PROBES_TOTAL
        .with_label_values(&[module, metrics::OUTCOME_BAD_REQUEST])
        .inc();
    StatusCode::BAD_REQUEST.into_response()
}
