//! # Response Mapping Middleware
//!
//! Gives error responses the framework writes on its own (extractor
//! rejections, unknown routes, wrong methods) the same JSON body as errors
//! returned by handlers.
//!
//! Responses that already went through the normalizer, successful responses
//! and JSON error bodies written deliberately by a handler pass through
//! unchanged.

use axum::{
    extract::Request,
    http::header::{ALLOW, CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lib_core::Error;
use std::sync::Arc;
use tracing::debug;

/// Rejection bodies are short plain-text messages.
const REJECTION_BODY_LIMIT: usize = 16 * 1024;

/// Response mapping middleware.
pub async fn map_res(req: Request, next: Next) -> Response {
    let res = next.run(req).await;

    let status = res.status();
    if !(status.is_client_error() || status.is_server_error())
        || res.extensions().get::<Arc<Error>>().is_some()
        || is_json(&res)
    {
        return res;
    }

    let (parts, body) = res.into_parts();
    let message = match axum::body::to_bytes(body, REJECTION_BODY_LIMIT).await {
        Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).into_owned(),
        _ => status.canonical_reason().unwrap_or_default().to_string(),
    };
    debug!("[RESPONSE] Mapping framework error {}: {}", status, message);

    let mut mapped = Error::framework(status, message).into_response();
    if let Some(allow) = parts.headers.get(ALLOW) {
        mapped.headers_mut().insert(ALLOW, allow.clone());
    }
    mapped
}

fn is_json(res: &Response) -> bool {
    res.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json") || ct.contains("+json"))
}
