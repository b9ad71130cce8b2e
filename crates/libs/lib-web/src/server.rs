//! # Layer Wiring
//!
//! Applies the shared middleware stack to a service router.
//!
//! Request flow, outermost first:
//!
//! 1. `resolve_user` - identifies the caller
//! 2. `log_requests` - one `http log` record per request
//! 3. `map_res` - normalizes framework-generated error responses
//! 4. catch-panic - turns handler panics into the normalized 500
//!
//! Panics are caught innermost so they are still logged and counted as 500s.

// region: --- Imports
use crate::middleware::{handle_panic, log_requests, map_res, resolve_user, HttpLogConfig};
use axum::{middleware, Router};
use lib_core::Config;
use tower_http::catch_panic::CatchPanicLayer;
// endregion: --- Imports

/// Wrap every route (and the fallback) of `router` with the shared middleware.
///
/// Call after all routes are registered.
///
/// ```rust,no_run
/// use axum::{routing::get, Router};
/// use lib_core::Config;
/// use lib_web::server::with_common_layers;
///
/// let config = Config::default();
/// let app: Router = with_common_layers(Router::new().route("/", get(|| async { "ok" })), &config);
/// ```
pub fn with_common_layers<S>(router: Router<S>, config: &Config) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(map_res))
        .layer(middleware::from_fn_with_state(
            HttpLogConfig::from(config),
            log_requests,
        ))
        .layer(middleware::from_fn(resolve_user))
}
