//! HTTP Admission Middleware
//!
//! Runs the [`AdmissionController`] once per request before any handler,
//! and answers `429 Too Many Requests` on denial.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::metrics;
use crate::rate_limit::AdmissionController;

/// Key used when neither headers nor the socket identify the caller
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Admission middleware for `axum::middleware::from_fn_with_state`
pub async fn admission_middleware(
    State(controller): State<Arc<AdmissionController>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let key = client_key(
        request.headers(),
        peer,
        controller.config().trust_forwarded_headers,
    );

    let allowed = controller.allow(&key);
    metrics::record_decision(allowed);

    if !allowed {
        tracing::debug!(client = %key, path = %request.uri().path(), "Request rate limited");
        return too_many_requests(controller.config().rate);
    }

    next.run(request).await
}

/// Derive the client key for a request
///
/// With `trust_forwarded` set, the first `X-Forwarded-For` entry wins, then
/// `X-Real-IP`. Otherwise, or when both are absent, the peer IP is used.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Whole seconds until a depleted client earns its next token
///
/// `None` when the client never refills.
pub fn retry_after_secs(rate: f64) -> Option<u64> {
    if rate > 0.0 && rate.is_finite() {
        Some((1.0 / rate).ceil().max(1.0) as u64)
    } else {
        None
    }
}

/// 429 response returned on denial
fn too_many_requests(rate: f64) -> Response {
    let mut response = (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
    if let Some(secs) = retry_after_secs(rate) {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}
