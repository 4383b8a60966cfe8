//! HTTP adapter for the edge
//!
//! Every request other than `/metrics` falls through to the gateway, which
//! owns routing. axum only converts between HTTP and [`EdgeRequest`].

pub mod metrics;
pub mod trace;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::gateway::{EdgeRequest, Gateway};
use self::metrics::{ObservabilityLayer, REQUEST_ID_HEADER};
use self::trace::SanitizedMakeSpan;

pub fn edge_router(gateway: Arc<Gateway>, prometheus: Option<PrometheusHandle>) -> Router {
    let surface = gateway.surface_handle();

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::new(prometheus));

    Router::new()
        .fallback(edge_handler)
        .with_state(gateway)
        .merge(metrics_routes)
        .layer(ObservabilityLayer::new(surface))
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
}

async fn edge_handler(
    State(gateway): State<Arc<Gateway>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = EdgeRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query: parse_query(uri.query()),
        authorization: header_value(&headers, AUTHORIZATION.as_str()),
        body: (!body.is_empty()).then(|| body.to_vec()),
        request_id: header_value(&headers, REQUEST_ID_HEADER),
    };

    match gateway.dispatch(request).await {
        Ok(response) => response.into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /metrics: Prometheus text exposition format.
async fn metrics_handler(State(handle): State<Arc<Option<PrometheusHandle>>>) -> Response {
    match handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics not enabled").into_response(),
    }
}

/// Decode a query string. A repeated name keeps its last value.
fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
