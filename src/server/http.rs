//! HTTP surface: a single `/` endpoint in front of [`RenderProxy`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Request, State},
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
            ACCESS_CONTROL_REQUEST_METHOD, CONTENT_TYPE, ORIGIN,
        },
    },
    response::{IntoResponse, Response},
    routing::any,
};
use serde_json::json;
use tracing::info;
use url::form_urlencoded;

use crate::gateway::{InboundRequest, Outcome, RenderProxy};
use crate::types::RequestContext;

pub const WAIT_UNTIL_HEADER: &str = "x-browser-wait-until";
pub const TIMEOUT_HEADER: &str = "x-browser-timeout";
pub const TOKEN_HEADER: &str = "x-token";

const PROXY_MODE: HeaderName = HeaderName::from_static("x-proxy-mode");
const CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");
const ROTATED_TOKEN: HeaderName = HeaderName::from_static("x-token");

const HTML: &str = "text/html";

#[derive(Clone)]
pub struct HttpState {
    pub proxy: Arc<RenderProxy>,
    /// Log every destination request with its headers.
    pub debug: bool,
}

impl HttpState {
    pub fn new(proxy: Arc<RenderProxy>) -> Self {
        Self {
            proxy,
            debug: false,
        }
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", any(entry))
        .fallback(not_found)
        .with_state(state)
}

async fn entry(State(state): State<HttpState>, request: Request) -> Response {
    let method = request.method().clone();
    if method == Method::OPTIONS {
        if is_preflight(request.headers()) {
            return preflight();
        }
        return method_not_allowed();
    }
    if method != Method::GET && method != Method::HEAD {
        return method_not_allowed();
    }

    let inbound = inbound_request(&request);
    if state.debug && inbound.target().is_some() {
        info!(
            url = %request.uri(),
            headers = ?redacted_headers(request.headers()),
            "browser_request"
        );
    }
    drop(request);

    outcome_response(state.proxy.handle(inbound).await)
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

fn is_preflight(headers: &HeaderMap) -> bool {
    headers.contains_key(ORIGIN) && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD)
}

fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, "*"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "*"),
        ],
    )
        .into_response()
}

fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// Extract the transport-independent request from an HTTP request.
pub fn inbound_request(request: &Request) -> InboundRequest {
    let headers = request.headers();
    let destination = request.uri().query().and_then(|query| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == "destination")
            .map(|(_, value)| value.into_owned())
    });

    let mut context = RequestContext::new();
    if let Some(token) = header_str(headers, TOKEN_HEADER) {
        context = context.token(token);
    }
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        context = context.remote_addr(addr.ip());
    }

    InboundRequest {
        destination,
        wait_until: header_str(headers, WAIT_UNTIL_HEADER),
        timeout: header_str(headers, TIMEOUT_HEADER),
        context,
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if name.as_str() == TOKEN_HEADER {
                "[redacted]".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

/// Map a terminal orchestrator state to its HTTP response.
pub fn outcome_response(outcome: Outcome) -> Response {
    let status = StatusCode::from_u16(outcome.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match outcome {
        Outcome::Healthy { status: message } => (
            status,
            [(ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            Json(json!({ "status": message })),
        )
            .into_response(),
        Outcome::Unhealthy => error_response(status, "Browser cluster not ready"),
        Outcome::Denied => error_response(status, "Invalid or missing token"),
        Outcome::RenderFailed => error_response(status, "Browser cluster failed or timed out"),
        Outcome::CacheHit { markup } => (
            status,
            [
                (CONTENT_TYPE, HTML),
                (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                (PROXY_MODE, "browser-cache"),
                (CACHE_STATUS, "HIT"),
            ],
            markup,
        )
            .into_response(),
        Outcome::Rendered { markup, token } => {
            let mut response = (
                status,
                [
                    (CONTENT_TYPE, HTML),
                    (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                    (PROXY_MODE, "browser"),
                    (CACHE_STATUS, "MISS"),
                ],
                markup,
            )
                .into_response();
            if let Some(value) = token.and_then(|t| HeaderValue::from_str(&t).ok()) {
                let headers = response.headers_mut();
                headers.insert(ROTATED_TOKEN, value);
                headers.insert(
                    ACCESS_CONTROL_EXPOSE_HEADERS,
                    HeaderValue::from_static("X-Token"),
                );
            }
            response
        }
    }
}

fn error_response(status: StatusCode, message: &'static str) -> Response {
    (
        status,
        [(ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(json!({ "error": message })),
    )
        .into_response()
}
