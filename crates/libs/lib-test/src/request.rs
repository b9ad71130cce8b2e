//! Request description and captured response.

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode},
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";
pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// One simulated call.
///
/// Defaults: `GET /`, JSON content type, expected status 200 (201 for
/// [`Tester::post`](crate::Tester::post)).
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub method: Method,
    pub route: String,
    /// `None` means the method's default.
    pub expected_status: Option<StatusCode>,
    pub headers: Vec<(String, String)>,
    /// Urlencoded query string, without the leading `?`.
    pub query: Option<String>,
    /// Encoded request body.
    pub body: Option<Vec<u8>>,
    pub content_type: String,
    /// Compared with the raw response body for successful responses.
    pub expected_body: Option<String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: Method::GET,
            route: "/".to_string(),
            expected_status: None,
            headers: Vec::new(),
            query: None,
            body: None,
            content_type: JSON_CONTENT_TYPE.to_string(),
            expected_body: None,
        }
    }
}

impl RequestConfig {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn expect_status(mut self, status: StatusCode) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn expect_body(mut self, body: impl Into<String>) -> Self {
        self.expected_body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        self.query = Some(serde_urlencoded::to_string(query).expect("encode request query"));
        self
    }

    /// JSON body. A string is sent verbatim, so other formats can be posted
    /// together with [`content_type`](Self::content_type).
    pub fn body<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        let encoded = match serde_json::to_value(body).expect("encode request body") {
            Value::String(raw) => raw.into_bytes(),
            value => serde_json::to_vec(&value).expect("encode request body"),
        };
        self.body = Some(encoded);
        self
    }

    /// Urlencoded form body.
    pub fn form<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        let encoded = serde_urlencoded::to_string(body).expect("encode form body");
        self.body = Some(encoded.into_bytes());
        self.content_type = FORM_CONTENT_TYPE.to_string();
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Route with the encoded query appended.
    pub(crate) fn uri(&self) -> String {
        match self.query.as_deref() {
            Some(query) if !query.is_empty() => {
                let sep = if self.route.contains('?') { '&' } else { '?' };
                format!("{}{}{}", self.route, sep, query)
            }
            _ => self.route.clone(),
        }
    }

    pub(crate) fn encoded_body(&self) -> Vec<u8> {
        self.body.clone().unwrap_or_default()
    }
}

/// Response captured by the harness.
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Decode the body into a response model.
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!("decode response: {e}; body: {}", self.text())
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = RequestConfig::default();
        assert_eq!(config.method, Method::GET);
        assert_eq!(config.route, "/");
        assert_eq!(config.content_type, JSON_CONTENT_TYPE);
        assert!(config.expected_status.is_none());
    }

    #[test]
    fn test_uri_appends_query() {
        let config = RequestConfig::new("/users").query(&json!({"id": 1}));
        assert_eq!(config.uri(), "/users?id=1");

        let config = RequestConfig::new("/users?page=2").query(&[("size", "5")]);
        assert_eq!(config.uri(), "/users?page=2&size=5");
    }

    #[test]
    fn test_query_from_tuple_slices_and_structs() {
        let config = RequestConfig::new("/users").query(&[("id", 1), ("size", 20)]);
        assert_eq!(config.uri(), "/users?id=1&size=20");

        #[derive(Serialize)]
        struct Search<'a> {
            name: &'a str,
            page: u32,
        }
        let config = RequestConfig::new("/users").query(&Search { name: "a b", page: 2 });
        assert_eq!(config.uri(), "/users?name=a+b&page=2");
    }

    #[test]
    fn test_form_from_tuple_slice() {
        let config = RequestConfig::new("/form").form(&[("data", "test")]);
        assert_eq!(config.encoded_body(), b"data=test".to_vec());
        assert_eq!(config.content_type, FORM_CONTENT_TYPE);
    }

    #[test]
    fn test_body_encodings() {
        let config = RequestConfig::new("/").body(&json!({"id": 11}));
        assert_eq!(config.encoded_body(), br#"{"id":11}"#.to_vec());

        let config = RequestConfig::new("/").form(&json!({"data": "a b"}));
        assert_eq!(config.encoded_body(), b"data=a+b".to_vec());

        let config = RequestConfig::new("/").body("<User><id>12</id></User>");
        assert_eq!(config.encoded_body(), b"<User><id>12</id></User>".to_vec());
    }
}
