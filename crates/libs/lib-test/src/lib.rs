//! # Test Harness
//!
//! Drive an in-process [`axum::Router`] the way a client would, without
//! binding a port.
//!
//! A [`Tester`] is a simulated caller (optionally holding a bearer token), a
//! [`RequestConfig`] describes one call and what it should return.
//!
//! ```rust,ignore
//! use lib_test::{RequestConfig, Tester};
//!
//! let app = build_router();
//! let user = Tester::new(1);
//!
//! user.get(&app, RequestConfig::new("/users").query(&[("id", 1)])).await;
//! user.post(&app, RequestConfig::new("/users").body(&json!({"id": 11}))).await;
//! ```
//!
//! Mismatches panic, so the harness is meant for `#[tokio::test]` functions.

mod request;
mod tester;

pub use request::{RequestConfig, TestResponse};
pub use tester::{admin_tester, default_testers, user_tester, Tester, TEST_TOKEN_SECRET};
