//! # Identity Middleware
//!
//! Resolves the calling user from the gateway header or the bearer token and
//! makes it available to handlers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use lib_web::middleware::mw_auth::{resolve_user, UserId};
//!
//! async fn me(UserId(id): UserId) -> String {
//!     format!("Hello, user {id}!")
//! }
//!
//! let app: Router = Router::new()
//!     .route("/me", get(me))
//!     .layer(middleware::from_fn(resolve_user));
//! ```
//!
//! `UserId` rejects anonymous callers with a normalized 401. Use
//! `Option<UserId>` for routes that also serve anonymous callers.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use lib_auth::{resolve_user_id, CONSUMER_USERNAME_HEADER};
use lib_core::{Error, HttpError};
use std::convert::Infallible;
use tracing::debug;

/// Id of the authenticated caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Resolve the caller's id from request headers.
///
/// Every failure is reported as 401 "Unauthorized".
pub fn get_user_id(headers: &HeaderMap) -> Result<i64, Error> {
    let consumer = headers
        .get(CONSUMER_USERNAME_HEADER)
        .and_then(|v| v.to_str().ok());
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());

    resolve_user_id(consumer, authorization).map_err(|e| {
        debug!("[AUTH] Caller not identified: {}", e);
        HttpError::unauthorized(Some("Unauthorized")).into()
    })
}

/// Identity middleware. Stores [`UserId`] in the request extensions when the
/// caller can be identified; anonymous requests pass through untouched.
pub async fn resolve_user(mut req: Request, next: Next) -> Response {
    if let Ok(id) = get_user_id(req.headers()) {
        req.extensions_mut().insert(UserId(id));
    }

    next.run(req).await
}

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<UserId>() {
            return Ok(*id);
        }
        get_user_id(&parts.headers).map(UserId)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for UserId {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<UserId>()
            .copied()
            .or_else(|| get_user_id(&parts.headers).ok().map(UserId)))
    }
}
