//! # Authentication Library
//!
//! Caller identity from gateway headers or bearer token payloads.

pub mod identity;
pub mod token;

// Re-export commonly used types
pub use identity::{resolve_user_id, CONSUMER_USERNAME_HEADER};
pub use token::{encode_jwt, parse_jwt_payload, UserClaims};
