//! # Web Library
//!
//! Middleware, extractors and logging setup shared by axum services.

pub mod log;
pub mod middleware;
pub mod server;
pub mod validate;

pub use log::init_logging;
pub use middleware::{get_user_id, UserId};
pub use server::with_common_layers;
pub use validate::{validate_body, validate_query, validate_struct, ValidatedBody, ValidatedQuery};
