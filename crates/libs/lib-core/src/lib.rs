//! # Core Library
//!
//! Error taxonomy, the error normalizer and service configuration.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{Config, ConfigError, LogFormat};
pub use error::{sanitize_status, Error, ErrorDetail, ErrorDetailElement, HttpError, Result};
