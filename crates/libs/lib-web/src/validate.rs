//! # Request Validation
//!
//! Parse, default and validate query strings and request bodies in one step.
//!
//! Defaults come from serde (`#[serde(default)]` plus a `Default` impl), rules
//! from `validator`. A payload that cannot be parsed is a 400 with the
//! parser's message; a payload that parses but breaks a rule is a 400 with the
//! per-field `detail` list.
//!
//! ```rust,no_run
//! use axum::{routing::post, Json, Router};
//! use lib_web::validate::ValidatedBody;
//! use serde::{Deserialize, Serialize};
//! use validator::Validate;
//!
//! #[derive(Default, Deserialize, Serialize, Validate)]
//! #[serde(default)]
//! struct CreateUser {
//!     #[validate(range(min = 1))]
//!     id: i64,
//! }
//!
//! async fn create(ValidatedBody(user): ValidatedBody<CreateUser>) -> Json<CreateUser> {
//!     Json(user)
//! }
//!
//! let app: Router = Router::new().route("/users", post(create));
//! ```

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap, Uri},
    Json,
};
use lib_core::{Error, HttpError};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Run the model's validation rules.
pub fn validate_struct<T: Validate>(model: &T) -> Result<(), Error> {
    model.validate().map_err(Error::from)
}

/// Parse the query string of `uri` into `T`, then validate it.
pub fn validate_query<T>(uri: &Uri) -> Result<T, Error>
where
    T: DeserializeOwned + Validate,
{
    let Query(model) = Query::<T>::try_from_uri(uri)
        .map_err(|rejection| HttpError::bad_request(Some(&rejection.body_text())))?;

    validate_struct(&model)?;
    Ok(model)
}

/// Parse `body` according to its `Content-Type`, then validate it.
///
/// An empty body yields `T::default()`, which is still validated. JSON, XML
/// and urlencoded forms are understood.
pub fn validate_body<T>(headers: &HeaderMap, body: &Bytes) -> Result<T, Error>
where
    T: DeserializeOwned + Validate + Default,
{
    let model = if body.is_empty() {
        T::default()
    } else {
        parse_body(headers, body)?
    };

    validate_struct(&model)?;
    Ok(model)
}

fn parse_body<T: DeserializeOwned>(headers: &HeaderMap, body: &Bytes) -> Result<T, Error> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        let Json(model) = Json::<T>::from_bytes(body)
            .map_err(|rejection| HttpError::bad_request(Some(&rejection.body_text())))?;
        Ok(model)
    } else if mime == "application/xml" || mime == "text/xml" || mime.ends_with("+xml") {
        let text = std::str::from_utf8(body)
            .map_err(|e| HttpError::bad_request(Some(&format!("Invalid XML body: {e}"))))?;
        quick_xml::de::from_str(text)
            .map_err(|e| HttpError::bad_request(Some(&format!("Invalid XML body: {e}"))).into())
    } else if mime == "application/x-www-form-urlencoded" {
        serde_urlencoded::from_bytes(body)
            .map_err(|e| HttpError::bad_request(Some(&e.to_string())).into())
    } else {
        Err(HttpError::bad_request(Some(&format!(
            "Unsupported Content-Type `{content_type}`"
        )))
        .into())
    }
}

/// Extractor running [`validate_query`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        validate_query(&parts.uri).map(ValidatedQuery)
    }
}

/// Extractor running [`validate_body`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedBody<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedBody<T>
where
    T: DeserializeOwned + Validate + Default,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let headers = req.headers().clone();
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| Error::framework(rejection.status(), rejection.body_text()))?;

        validate_body(&headers, &body).map(ValidatedBody)
    }
}
