//! # Middleware
//!
//! Axum middleware for caller identity, request logging, panic recovery and
//! response mapping.
//!
//! ## Modules
//!
//! - **[`mw_auth`]**: caller identity from gateway header or bearer token
//! - **[`mw_logging`]**: structured per-request log record
//! - **[`mw_panic`]**: panic recovery handler
//! - **[`mw_res_map`]**: normalizes framework-generated error responses

// region: --- Modules
pub mod mw_auth;
pub mod mw_logging;
pub mod mw_panic;
pub mod mw_res_map;
// endregion: --- Modules

// region: --- Re-exports
pub use mw_auth::{get_user_id, resolve_user, UserId};
pub use mw_logging::{log_requests, HttpLogConfig};
pub use mw_panic::handle_panic;
pub use mw_res_map::map_res;
// endregion: --- Re-exports
