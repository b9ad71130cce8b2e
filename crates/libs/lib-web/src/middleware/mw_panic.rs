//! # Panic Recovery
//!
//! Handler for [`tower_http::catch_panic::CatchPanicLayer`]: logs the panic
//! with a stack trace and answers with the normalized 500 body.
//!
//! ```rust,no_run
//! use axum::Router;
//! use lib_web::middleware::mw_panic::handle_panic;
//! use tower_http::catch_panic::CatchPanicLayer;
//!
//! let app: Router = Router::new().layer(CatchPanicLayer::custom(handle_panic));
//! ```

use axum::response::{IntoResponse, Response};
use lib_core::HttpError;
use std::any::Any;
use std::backtrace::Backtrace;
use tracing::error;

pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let panic = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    let stack = Backtrace::force_capture();
    error!(panic = %panic, stack = %stack, "stacktrace");

    HttpError::internal_server_error(None).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    #[tokio::test]
    async fn test_panic_becomes_normalized_500() {
        async fn explode() -> &'static str {
            panic!("boom")
        }

        let app = Router::new()
            .route("/panic", get(explode))
            .layer(CatchPanicLayer::custom(handle_panic));

        let res = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/panic")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"code":500,"message":"Internal Server Error"}"#);
    }

    #[test]
    fn test_handle_panic_accepts_any_payload() {
        let res = handle_panic(Box::new(42_u8));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
