//! Request correlation
//!
//! Every request runs inside an `enem_request` span carrying its id and the
//! collection it targets. The id is echoed in the `x-request-id` response
//! header so clients can quote it when reporting a failure.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Header read from the client and written on every response
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_CLIENT_ID_LEN: usize = 64;

/// Client-supplied id when it is short printable ASCII, a fresh uuid otherwise
fn request_id(request: &Request) -> String {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_CLIENT_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// First path segment (`municipios`, `resultados`, ...), `root` for `/`
fn colecao(path: &str) -> &str {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("root")
}

/// Tag the request with an id, log its outcome and echo the id back
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let colecao = colecao(&path).to_string();
    let start = Instant::now();

    let span = info_span!(
        "enem_request",
        request_id = %request_id,
        method = %method,
        colecao = %colecao,
        path = %path,
    );

    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis();
    if response.status().is_server_error() {
        warn!(request_id = %request_id, colecao = %colecao, status, duration_ms, "{} {} failed", method, path);
    } else {
        info!(request_id = %request_id, colecao = %colecao, status, duration_ms, "{} {}", method, path);
    }

    response
}
