//! HTTP observability middleware
//!
//! Tower Layer/Service that assigns a request ID and records per-route
//! metrics. Paths are labelled by their resource template so `{id}` values
//! never become label values.

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    response::Response,
};
use metrics::{counter, gauge, histogram};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

use crate::surface::ApiSurface;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct ObservabilityLayer {
    surface: Arc<ApiSurface>,
}

impl ObservabilityLayer {
    pub fn new(surface: Arc<ApiSurface>) -> Self {
        Self { surface }
    }
}

impl<S> Layer<S> for ObservabilityLayer {
    type Service = ObservabilityMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ObservabilityMiddleware {
            inner,
            surface: self.surface.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ObservabilityMiddleware<S> {
    inner: S,
    surface: Arc<ApiSurface>,
}

impl<S> Service<Request<Body>> for ObservabilityMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let method = request.method().to_string();
        let resource = route_label(&self.surface, request.uri().path());

        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            request.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        gauge!("ecommerce_http_requests_in_flight").increment(1.0);
        let start = Instant::now();

        let mut inner = self.inner.clone();
        let span = tracing::info_span!("edge", request_id = %request_id);

        Box::pin(
            async move {
                let mut response = inner.call(request).await?;

                let status = response.status().as_u16().to_string();
                counter!("ecommerce_http_requests_total", "method" => method.clone(), "resource" => resource.clone(), "status" => status)
                    .increment(1);
                histogram!("ecommerce_http_request_duration_seconds", "method" => method, "resource" => resource)
                    .record(start.elapsed().as_secs_f64());
                gauge!("ecommerce_http_requests_in_flight").decrement(1.0);

                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Resource template for a concrete path, or `unmatched`.
fn route_label(surface: &ApiSurface, path: &str) -> String {
    surface
        .tree()
        .match_path(path)
        .and_then(|m| surface.tree().path(m.resource))
        .map(str::to_string)
        .unwrap_or_else(|| "unmatched".to_string())
}
