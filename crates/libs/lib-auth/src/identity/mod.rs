//! # Caller Identity
//!
//! Works out which user made a request.
//!
//! Two sources are consulted, in order:
//!
//! 1. `X-Consumer-Username`, set by the Kong gateway after it authenticated
//!    the caller. Used when it holds an integer.
//! 2. The payload of the bearer token in `Authorization` (see [`crate::token`]).

use crate::token::{self, parse_jwt_payload, UserClaims};

/// Header the gateway uses to forward the authenticated consumer.
pub const CONSUMER_USERNAME_HEADER: &str = "X-Consumer-Username";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authorization header missing")]
    MissingToken,

    #[error(transparent)]
    InvalidToken(#[from] token::Error),

    #[error("token carries no user id")]
    NoSubject,
}

/// Resolve the caller's user id from the raw header values.
pub fn resolve_user_id(
    consumer_username: Option<&str>,
    authorization: Option<&str>,
) -> Result<i64, Error> {
    if let Some(id) = consumer_username.and_then(|name| name.parse::<i64>().ok()) {
        return Ok(id);
    }

    let authorization = authorization
        .filter(|value| !value.is_empty())
        .ok_or(Error::MissingToken)?;

    let claims: UserClaims = parse_jwt_payload(authorization)?;
    claims.subject().ok_or(Error::NoSubject)
}
