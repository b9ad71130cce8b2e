//! # Request Logging Middleware
//!
//! Emits one structured `http log` record per request, after the response is
//! known.
//!
//! | Field         | Source                                                  |
//! |---------------|---------------------------------------------------------|
//! | `status_code` | final response status                                   |
//! | `method`      | request method                                          |
//! | `origin_url`  | path and query as received                              |
//! | `remote_ip`   | `X-Real-IP` header set by the proxy                     |
//! | `latency`     | handling time in milliseconds                           |
//! | `user_id`     | [`UserId`] resolved by `resolve_user`, if any           |
//! | `error`       | message of the error the normalizer wrote, if any       |
//! | `body`        | POST/PUT bodies, `password` removed                     |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use axum::{middleware, Router};
//! use lib_web::middleware::mw_logging::{log_requests, HttpLogConfig};
//!
//! let app: Router = Router::new()
//!     .layer(middleware::from_fn_with_state(HttpLogConfig::default(), log_requests));
//! ```

use crate::middleware::mw_auth::UserId;
use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use lib_core::{config::DEFAULT_LOG_BODY_LIMIT, Config, Error};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Body keys never written to logs.
const REDACTED_KEYS: &[&str] = &["password"];

#[derive(Clone, Debug)]
pub struct HttpLogConfig {
    /// Bodies larger than this (or of unknown size) are not captured.
    pub body_limit: usize,
}

impl Default for HttpLogConfig {
    fn default() -> Self {
        Self {
            body_limit: DEFAULT_LOG_BODY_LIMIT,
        }
    }
}

impl From<&Config> for HttpLogConfig {
    fn from(config: &Config) -> Self {
        Self {
            body_limit: config.log_body_limit,
        }
    }
}

/// Request facts captured before the request is handed on.
struct RequestRecord {
    start: Instant,
    method: Method,
    origin_url: String,
    remote_ip: String,
    user_id: Option<i64>,
}

impl RequestRecord {
    fn new(req: &Request) -> Self {
        Self {
            start: Instant::now(),
            method: req.method().clone(),
            origin_url: req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.uri().path().to_string()),
            remote_ip: req
                .headers()
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
            user_id: req.extensions().get::<UserId>().map(|u| u.0),
        }
    }

    fn emit(&self, response: &Response, body: Option<&str>) {
        let latency = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let error = response
            .extensions()
            .get::<Arc<Error>>()
            .map(|err| err.message());

        info!(
            status_code = response.status().as_u16(),
            method = %self.method,
            origin_url = %self.origin_url,
            remote_ip = %self.remote_ip,
            latency,
            user_id = self.user_id,
            error = error.as_deref(),
            body,
            "http log"
        );
    }
}

/// Request logging middleware.
pub async fn log_requests(
    State(config): State<HttpLogConfig>,
    req: Request,
    next: Next,
) -> Response {
    let record = RequestRecord::new(&req);

    let (req, body) = if record.method == Method::POST || record.method == Method::PUT {
        match capture_body(req, config.body_limit).await {
            Ok(captured) => captured,
            Err(res) => {
                record.emit(&res, None);
                return res;
            }
        }
    } else {
        (req, None)
    };

    let response = next.run(req).await;
    record.emit(&response, body.as_deref());
    response
}

/// Buffer a request body of known, bounded size so it can be both logged and
/// handed on to the handler.
async fn capture_body(req: Request, limit: usize) -> Result<(Request, Option<String>), Response> {
    let fits = req
        .body()
        .size_hint()
        .upper()
        .is_some_and(|len| usize::try_from(len).is_ok_and(|len| len <= limit));
    if !fits {
        return Ok((req, None));
    }

    let (parts, body) = req.into_parts();
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => {
            let logged = redact_body(&bytes);
            Ok((Request::from_parts(parts, Body::from(bytes)), Some(logged)))
        }
        Err(err) => {
            warn!("[REQUEST] Failed to read request body: {}", err);
            Err(lib_core::HttpError::bad_request(Some(&err.to_string())).into_response())
        }
    }
}

/// JSON objects are logged without sensitive keys; anything else is logged as text.
fn redact_body(bytes: &Bytes) -> String {
    match serde_json::from_slice::<Map<String, Value>>(bytes) {
        Ok(mut object) => {
            for key in REDACTED_KEYS {
                object.remove(*key);
            }
            Value::Object(object).to_string()
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::capture::CapturedLogs;
    use axum::{middleware, routing::post, Router};
    use http_body::{Frame, SizeHint};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tower::ServiceExt;

    /// Announces four bytes, then fails mid-read.
    struct BrokenBody;

    impl HttpBody for BrokenBody {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::other("connection reset"))))
        }

        fn size_hint(&self) -> SizeHint {
            SizeHint::with_exact(4)
        }
    }

    fn http_logs(logs: &CapturedLogs) -> Vec<Value> {
        logs.records()
            .into_iter()
            .filter(|r| r["msg"] == "http log")
            .collect()
    }

    #[test]
    fn test_redact_body_removes_password() {
        let body = Bytes::from_static(br#"{"name":"alice","password":"hunter2"}"#);
        assert_eq!(redact_body(&body), r#"{"name":"alice"}"#);
    }

    #[test]
    fn test_redact_body_keeps_non_json_text() {
        let body = Bytes::from_static(b"data=hello");
        assert_eq!(redact_body(&body), "data=hello");
    }

    #[tokio::test]
    async fn test_body_still_reaches_handler() {
        let app = Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(middleware::from_fn_with_state(HttpLogConfig::default(), log_requests));

        let res = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from(r#"{"password":"secret"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"password":"secret"}"#);
    }

    #[tokio::test]
    async fn test_oversized_body_is_passed_through_uncaptured() {
        let app = Router::new()
            .route("/len", post(|body: Bytes| async move { body.len().to_string() }))
            .layer(middleware::from_fn_with_state(HttpLogConfig { body_limit: 4 }, log_requests));

        let res = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/len")
                    .body(Body::from("0123456789"))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"10");
    }

    #[tokio::test]
    async fn test_record_fields() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let app = Router::new()
            .route("/users", post(|| async { "created" }))
            .layer(middleware::from_fn_with_state(HttpLogConfig::default(), log_requests));

        app.oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri("/users?debug=1")
                .header("x-real-ip", "10.0.0.7")
                .body(Body::from(r#"{"name":"alice","password":"hunter2"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

        let records = http_logs(&logs);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["status_code"], 200);
        assert_eq!(record["method"], "POST");
        assert_eq!(record["origin_url"], "/users?debug=1");
        assert_eq!(record["remote_ip"], "10.0.0.7");
        assert_eq!(record["body"], r#"{"name":"alice"}"#);
        assert!(record.get("error").is_none());
    }

    #[tokio::test]
    async fn test_unreadable_body_is_still_logged() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let app = Router::new()
            .route("/users", post(|| async { "unreachable" }))
            .layer(middleware::from_fn_with_state(HttpLogConfig::default(), log_requests));

        let res = app
            .oneshot(
                axum::http::Request::builder()
                    .method("PUT")
                    .uri("/users")
                    .body(Body::new(BrokenBody))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), axum::http::StatusCode::BAD_REQUEST);

        let records = http_logs(&logs);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["status_code"], 400);
        assert_eq!(records[0]["method"], "PUT");
        assert!(records[0]["error"].as_str().is_some_and(|e| !e.is_empty()));
    }
}
