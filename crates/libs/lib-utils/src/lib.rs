//! # Utilities Library
//!
//! Shared utility functions for base64 decoding, environment variables and time parsing.

pub mod b64;
pub mod envs;
pub mod time;

// Re-export commonly used functions
pub use b64::{b64u_encode, b64u_decode};
pub use envs::{get_env, get_env_or, get_env_parse, get_env_parse_or};
pub use time::{parse_flexible, FlexibleTime};
