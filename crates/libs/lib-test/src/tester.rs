//! Simulated callers.

use crate::request::{RequestConfig, TestResponse};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use lib_auth::{encode_jwt, UserClaims};
use std::collections::HashMap;
use tower::ServiceExt;
use tracing::warn;

/// Secret the harness signs tokens with. Services only read the payload, so
/// the value never has to match anything.
pub const TEST_TOKEN_SECRET: &str = "lib-test-secret";

/// A caller. An empty `token` sends no `Authorization` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tester {
    pub id: i64,
    pub token: String,
}

impl Tester {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Caller carrying a signed token whose payload is `{"id": id, ...}`.
    pub fn new(id: i64) -> Self {
        let claims = UserClaims { id, user_id: 0 };
        let token = encode_jwt(&claims, TEST_TOKEN_SECRET).expect("sign test token");
        Self { id, token }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Send `config` through `app` and check the outcome.
    ///
    /// Panics when the status differs from the expected one (200 unless set),
    /// or when a successful response's body differs from `expected_body`.
    pub async fn request(&self, app: &Router, config: RequestConfig) -> TestResponse {
        let expected = config.expected_status.unwrap_or(StatusCode::OK);

        let mut builder = Request::builder()
            .method(config.method.clone())
            .uri(config.uri())
            .header(CONTENT_TYPE, config.content_type.as_str());
        if !self.token.is_empty() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", self.token));
        }
        for (name, value) in &config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let req = builder
            .body(Body::from(config.encoded_body()))
            .expect("construct http request");

        let res = app
            .clone()
            .oneshot(req)
            .await
            .unwrap_or_else(|never| match never {});

        let (parts, body) = res.into_parts();
        let body = to_bytes(body, usize::MAX).await.expect("read response body");
        let res = TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        };

        assert_eq!(
            res.status,
            expected,
            "status code for {} {}: body {}",
            config.method,
            config.route,
            res.text()
        );

        if res.status.as_u16() >= 400 {
            warn!(status = res.status.as_u16(), body = %res.text(), "error response");
        } else if let Some(expected_body) = &config.expected_body {
            assert_eq!(&res.text(), expected_body, "response body");
        }

        res
    }

    pub async fn get(&self, app: &Router, config: RequestConfig) -> TestResponse {
        self.request(app, config.method(Method::GET)).await
    }

    /// Expects 201 unless told otherwise.
    pub async fn post(&self, app: &Router, mut config: RequestConfig) -> TestResponse {
        config.expected_status.get_or_insert(StatusCode::CREATED);
        self.request(app, config.method(Method::POST)).await
    }

    pub async fn put(&self, app: &Router, config: RequestConfig) -> TestResponse {
        self.request(app, config.method(Method::PUT)).await
    }

    pub async fn patch(&self, app: &Router, config: RequestConfig) -> TestResponse {
        self.request(app, config.method(Method::PATCH)).await
    }

    pub async fn delete(&self, app: &Router, config: RequestConfig) -> TestResponse {
        self.request(app, config.method(Method::DELETE)).await
    }
}

/// Ordinary user, id 1.
pub fn user_tester() -> Tester {
    Tester::new(1)
}

/// Administrator, id 2.
pub fn admin_tester() -> Tester {
    Tester::new(2)
}

/// Callers keyed by user id: 0 is anonymous.
pub fn default_testers() -> HashMap<i64, Tester> {
    HashMap::from([
        (0, Tester::anonymous()),
        (1, user_tester()),
        (2, admin_tester()),
    ])
}
