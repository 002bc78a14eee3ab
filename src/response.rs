//! Locally fabricated responses.
//!
//! A [`SyntheticResponse`] is what a handler returns when it answers a
//! request itself instead of letting the host fetch it. The preflight
//! responder builds one per OPTIONS request; delegates may build their own
//! (a cached `304`, a bundled asset, ...).

/// Standard CORS header names, spelled as they are emitted.
pub mod headers {
    pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
    pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
    pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
    pub const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
    pub const MAX_AGE: &str = "Access-Control-Max-Age";
    pub const CONTENT_TYPE: &str = "Content-Type";
}

/// A response produced without any network round-trip.
///
/// Headers are an ordered list: they are emitted in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticResponse {
    pub mime_type: String,
    pub encoding: String,
    pub status_code: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SyntheticResponse {
    /// Empty-bodied response with no headers.
    pub fn new(status_code: u16, status_text: impl Into<String>) -> Self {
        Self {
            mime_type: "text/plain".to_string(),
            encoding: "UTF-8".to_string(),
            status_code,
            status_text: status_text.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_mime(mut self, mime_type: impl Into<String>, encoding: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self.encoding = encoding.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// `Content-Type` value as emitted on the wire, e.g. `text/plain; charset=UTF-8`.
    pub fn content_type(&self) -> String {
        if self.encoding.is_empty() {
            self.mime_type.clone()
        } else {
            format!("{}; charset={}", self.mime_type, self.encoding)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_includes_charset() {
        let response = SyntheticResponse::new(200, "OK");
        assert_eq!(response.content_type(), "text/plain; charset=UTF-8");
    }

    #[test]
    fn test_content_type_without_encoding() {
        let response = SyntheticResponse::new(200, "OK").with_mime("image/png", "");
        assert_eq!(response.content_type(), "image/png");
    }

    #[test]
    fn test_headers_keep_insertion_order() {
        let response = SyntheticResponse::new(304, "Not Modified")
            .with_header("ETag", "\"abc\"")
            .with_header("Cache-Control", "max-age=60");
        let names: Vec<&str> = response.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["ETag", "Cache-Control"]);
        assert_eq!(response.header("etag"), Some("\"abc\""));
    }
}
