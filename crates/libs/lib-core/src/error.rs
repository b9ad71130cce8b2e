//! # Centralized Error Handling
//!
//! This module defines the error type [`Error`] that every handler, extractor and
//! middleware in a service returns, and the normalizer that turns any of them into
//! the one JSON error shape clients see.
//!
//! ## Error Categories
//!
//! | Variant                          | Status | Body                                   |
//! |----------------------------------|--------|----------------------------------------|
//! | record not found (sqlx)          | 404    | `message` = underlying message         |
//! | [`Http`](Error::Http)            | own    | verbatim `code`, `message`, `detail`   |
//! | [`Framework`](Error::Framework)  | own    | rejection / router message             |
//! | [`Validation`](Error::Validation)| 400    | `detail` only                          |
//! | [`Aggregate`](Error::Aggregate)  | 400    | one message line per inner error       |
//! | anything else                    | 500    | `message` = error string               |
//!
//! ## Wire Format
//!
//! ```json
//! {"code": 404, "message": "User Not Found"}
//! {"code": 400, "detail": [{"field": "id", "tag": "range", "value": "0"}]}
//! ```
//!
//! `message` and `detail` are omitted when empty.
//!
//! ## Status Codes
//!
//! Application codes longer than three digits embed the HTTP class in their
//! leading digits (`400123` → `400`). See [`sanitize_status`].
//!
//! ## Usage Example
//!
//! ```rust
//! use lib_core::error::{HttpError, Result};
//!
//! fn find_user(id: i64) -> Result<String> {
//!     if id != 1 {
//!         return Err(HttpError::not_found(Some("User Not Found")).into());
//!     }
//!     Ok("alice".to_string())
//! }
//! ```

use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Convenience type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

// region:    --- HttpError

/// Structured HTTP error, and the normalized body written to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpError {
    /// Status code, or a longer application code prefixed by one.
    pub code: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Field violations, present only for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ErrorDetail>,
}

impl HttpError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    fn with_default(code: i64, message: Option<&str>, default: &str) -> Self {
        Self::new(code, message.unwrap_or(default))
    }

    /// 400, defaults to "Bad Request".
    pub fn bad_request(message: Option<&str>) -> Self {
        Self::with_default(400, message, "Bad Request")
    }

    /// 401, defaults to "Invalid JWT Token".
    pub fn unauthorized(message: Option<&str>) -> Self {
        Self::with_default(401, message, "Invalid JWT Token")
    }

    /// 403, defaults to "Forbidden".
    pub fn forbidden(message: Option<&str>) -> Self {
        Self::with_default(403, message, "Forbidden")
    }

    /// 404, defaults to "Not Found".
    pub fn not_found(message: Option<&str>) -> Self {
        Self::with_default(404, message, "Not Found")
    }

    /// 500, defaults to "Internal Server Error".
    pub fn internal_server_error(message: Option<&str>) -> Self {
        Self::with_default(500, message, "Internal Server Error")
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        Error::Http(self).into_response()
    }
}

// endregion: --- HttpError

// region:    --- ErrorDetail

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetailElement {
    pub field: String,
    /// Name of the violated rule (`required`, `range`, `email`, ...).
    pub tag: String,
    /// Rejected value rendered as text; empty when absent.
    pub value: String,
}

/// Ordered field violations from one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorDetail(pub Vec<ErrorDetailElement>);

impl ErrorDetail {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorDetailElement> {
        self.0.iter()
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validation Error")
    }
}

impl std::error::Error for ErrorDetail {}

impl From<&ValidationErrors> for ErrorDetail {
    /// Flattens nested struct and list errors into dotted field paths, sorted by field.
    fn from(errors: &ValidationErrors) -> Self {
        let mut elements = Vec::new();
        collect_violations(errors, "", &mut elements);
        elements.sort_by(|a, b| a.field.cmp(&b.field));
        Self(elements)
    }
}

impl From<ValidationErrors> for ErrorDetail {
    fn from(errors: ValidationErrors) -> Self {
        Self::from(&errors)
    }
}

fn collect_violations(errors: &ValidationErrors, prefix: &str, out: &mut Vec<ErrorDetailElement>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(violations) => {
                out.extend(violations.iter().map(|v| ErrorDetailElement {
                    field: path.clone(),
                    tag: v.code.to_string(),
                    value: render_value(v.params.get("value")),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_violations(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    collect_violations(inner, &format!("{path}[{idx}]"), out);
                }
            }
        }
    }
}

fn render_value(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// endregion: --- ErrorDetail

// region:    --- Error

/// Every error a request pipeline can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Error that already knows its status code.
    #[error("{0}")]
    Http(HttpError),

    /// Rejection raised by the web framework before or around the handler.
    #[error("{message}")]
    Framework { code: u16, message: String },

    #[error("{0}")]
    Validation(ErrorDetail),

    /// Several independent errors from one parsing or validation pass.
    #[error("{}", join_messages(.0))]
    Aggregate(Vec<Error>),

    /// Persistence error. `RowNotFound` is reported as 404.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn join_messages(errors: &[Error]) -> String {
    errors.iter().map(|e| e.message() + "\n").collect()
}

impl Error {
    pub fn framework(status: StatusCode, message: impl Into<String>) -> Self {
        Error::Framework {
            code: status.as_u16(),
            message: message.into(),
        }
    }

    /// Full message, including every context layer of a generic error.
    pub fn message(&self) -> String {
        match self {
            Error::Other(err) => format!("{err:#}"),
            other => other.to_string(),
        }
    }

    /// True for the persistence layer's "no rows" sentinel, also when it sits
    /// underneath context added with `anyhow`.
    pub fn is_record_not_found(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::RowNotFound) => true,
            Error::Other(err) => err
                .chain()
                .any(|cause| matches!(cause.downcast_ref::<sqlx::Error>(), Some(sqlx::Error::RowNotFound))),
            _ => false,
        }
    }

    /// Classify the error and derive the response status and body.
    pub fn normalize(&self) -> (StatusCode, HttpError) {
        let body = if self.is_record_not_found() {
            HttpError::new(404, self.message())
        } else {
            match self {
                Error::Http(err) => err.clone(),
                Error::Framework { code, message } => HttpError::new(i64::from(*code), message.clone()),
                Error::Validation(detail) => HttpError {
                    code: 400,
                    message: String::new(),
                    detail: Some(detail.clone()),
                },
                Error::Aggregate(errors) => HttpError::new(400, join_messages(errors)),
                Error::Database(_) | Error::Other(_) => HttpError::new(500, self.message()),
            }
        };

        (sanitize_status(body.code), body)
    }
}

/// Map an application code onto the status line.
///
/// Codes of up to three digits are used as they are; longer codes use their
/// first three digits when those fall in `400..600`. Anything that still is not
/// a status in `100..=599` becomes 500.
pub fn sanitize_status(code: i64) -> StatusCode {
    let digits = code.to_string();
    let status = if digits.len() <= 3 {
        code
    } else {
        match digits[..3].parse::<i64>() {
            Ok(prefix) if (400..600).contains(&prefix) => prefix,
            _ => 500,
        }
    };

    u16::try_from(status)
        .ok()
        .filter(|s| (100..=599).contains(s))
        .and_then(|s| StatusCode::from_u16(s).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Writes the normalized body and keeps the original error in the response
/// extensions (as `Arc<Error>`) for the logging middleware.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = self.normalize();

        if status.is_server_error() {
            tracing::error!(code = body.code, error = %self.message(), "Server error");
        } else {
            tracing::debug!(code = body.code, error = %self.message(), "Client error");
        }

        let mut res = (status, Json(body)).into_response();
        res.extensions_mut().insert(Arc::new(self));
        res
    }
}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        Error::Http(err)
    }
}

impl From<ErrorDetail> for Error {
    fn from(detail: ErrorDetail) -> Self {
        Error::Validation(detail)
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors.into())
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::framework(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::framework(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for Error {
    fn from(rejection: FormRejection) -> Self {
        Error::framework(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::framework(rejection.status(), rejection.body_text())
    }
}

// endregion: --- Error

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use serde_json::{json, Value};
    use validator::Validate;

    async fn body_json(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn test_constructors_default_messages() {
        assert_eq!(HttpError::bad_request(None), HttpError::new(400, "Bad Request"));
        assert_eq!(HttpError::unauthorized(None), HttpError::new(401, "Invalid JWT Token"));
        assert_eq!(HttpError::forbidden(None), HttpError::new(403, "Forbidden"));
        assert_eq!(HttpError::not_found(None), HttpError::new(404, "Not Found"));
        assert_eq!(
            HttpError::internal_server_error(None),
            HttpError::new(500, "Internal Server Error")
        );
    }

    #[test]
    fn test_constructor_custom_message() {
        let err = HttpError::unauthorized(Some("Unauthorized"));
        assert_eq!(err.code, 401);
        assert_eq!(err.to_string(), "Unauthorized");
    }

    #[test]
    fn test_sanitize_three_digit_codes_pass_through() {
        for code in [100, 200, 204, 301, 400, 404, 418, 500, 503, 599] {
            assert_eq!(sanitize_status(code).as_u16() as i64, code);
        }
    }

    #[test]
    fn test_sanitize_long_codes_use_prefix() {
        assert_eq!(sanitize_status(400123), StatusCode::BAD_REQUEST);
        assert_eq!(sanitize_status(4041), StatusCode::NOT_FOUND);
        assert_eq!(sanitize_status(5990001), StatusCode::from_u16(599).unwrap());
    }

    #[test]
    fn test_sanitize_long_codes_outside_error_range() {
        assert_eq!(sanitize_status(200001), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sanitize_status(600000), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sanitize_status(1000), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sanitize_status(-40012), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_sanitize_short_codes_outside_status_range() {
        assert_eq!(sanitize_status(42), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sanitize_status(0), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sanitize_status(600), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sanitize_status(-1), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_normalize_structured_error_verbatim() {
        let detail = ErrorDetail(vec![ErrorDetailElement {
            field: "name".into(),
            tag: "length".into(),
            value: "x".into(),
        }]);
        let err = Error::Http(HttpError {
            code: 409,
            message: "Conflict".into(),
            detail: Some(detail.clone()),
        });

        let (status, body) = err.normalize();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, 409);
        assert_eq!(body.message, "Conflict");
        assert_eq!(body.detail, Some(detail));
    }

    #[test]
    fn test_normalize_long_code_keeps_body_code() {
        let err: Error = HttpError::new(403001, "Quota exceeded").into();
        let (status, body) = err.normalize();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, 403001);
    }

    #[test]
    fn test_normalize_record_not_found() {
        let (status, body) = Error::Database(sqlx::Error::RowNotFound).normalize();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, 404);
        assert_eq!(body.message, sqlx::Error::RowNotFound.to_string());
    }

    #[test]
    fn test_normalize_record_not_found_under_context() {
        let result: std::result::Result<(), sqlx::Error> = Err(sqlx::Error::RowNotFound);
        let err: Error = result.context("load user 7").unwrap_err().into();

        let (status, body) = err.normalize();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.message.starts_with("load user 7: "));
    }

    #[test]
    fn test_normalize_other_database_error_is_500() {
        let (status, body) = Error::Database(sqlx::Error::PoolTimedOut).normalize();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, 500);
    }

    #[test]
    fn test_normalize_framework_error() {
        let err = Error::framework(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected request with `Content-Type: application/json`");
        let (status, body) = err.normalize();
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body.code, 415);
        assert!(body.detail.is_none());
    }

    #[test]
    fn test_normalize_validation_error_body() {
        let err = Error::Validation(ErrorDetail(vec![ErrorDetailElement {
            field: "id".into(),
            tag: "required".into(),
            value: String::new(),
        }]));

        let (status, body) = err.normalize();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"code": 400, "detail": [{"field": "id", "tag": "required", "value": ""}]})
        );
    }

    #[test]
    fn test_normalize_aggregate_joins_lines_in_order() {
        let err = Error::Aggregate(vec![
            HttpError::bad_request(Some("first")).into(),
            anyhow::anyhow!("second").into(),
            Error::framework(StatusCode::NOT_FOUND, "third"),
        ]);

        let (status, body) = err.normalize();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "first\nsecond\nthird\n");
        assert!(body.detail.is_none());
    }

    #[test]
    fn test_normalize_empty_aggregate() {
        let (status, body) = Error::Aggregate(Vec::new()).normalize();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "");
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"code": 400}));
    }

    #[test]
    fn test_normalize_generic_error() {
        let (status, body) = Error::from(anyhow::anyhow!("boom")).normalize();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"code": 500, "message": "boom"})
        );
    }

    #[test]
    fn test_validation_errors_flatten_and_sort() {
        #[derive(Validate)]
        struct Address {
            #[validate(length(min = 2))]
            city: String,
        }

        #[derive(Validate)]
        struct Signup {
            #[validate(range(min = 1))]
            id: i64,
            #[validate(email)]
            email: String,
            #[validate(nested)]
            address: Address,
        }

        let signup = Signup {
            id: 0,
            email: "not-an-email".into(),
            address: Address { city: "X".into() },
        };
        let detail = ErrorDetail::from(signup.validate().unwrap_err());

        let fields: Vec<_> = detail.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["address.city", "email", "id"]);

        let id = &detail.0[2];
        assert_eq!(id.tag, "range");
        assert_eq!(id.value, "0");

        let email = &detail.0[1];
        assert_eq!(email.tag, "email");
        assert_eq!(email.value, "not-an-email");
    }

    #[tokio::test]
    async fn test_into_response_not_found_constructor() {
        let res = HttpError::not_found(Some("User Not Found")).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.extensions().get::<Arc<Error>>().is_some());
        assert_eq!(
            body_json(res).await,
            json!({"code": 404, "message": "User Not Found"})
        );
    }

    #[tokio::test]
    async fn test_into_response_from_sqlite_missing_row() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");

        let err = sqlx::query("SELECT 1 WHERE 0 = 1")
            .fetch_one(&pool)
            .await
            .err()
            .expect("query returns no rows");

        let res = Error::from(err).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await["code"], 404);
    }
}
// endregion: --- Tests
