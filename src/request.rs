//! Immutable view of an in-flight resource request.
//!
//! The host builds one [`InterceptedRequest`] per resource load and hands it
//! to the installed handler by reference. Nothing in the bridge mutates it.

use std::fmt;

/// Header map with case-insensitive lookup.
///
/// Keeps the host's header order and spelling; only lookups fold case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header. Duplicate names are kept, as on the wire.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value whose name matches `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A resource request as seen by the interception pipeline.
///
/// `method` is kept exactly as the host reported it (it may be empty when the
/// host could not determine one); comparisons go through
/// [`InterceptedRequest::method_is`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    method: String,
    url: String,
    headers: Headers,
}

impl InterceptedRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
        }
    }

    /// Builder-style header attachment, mostly for hosts and tests.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Case-insensitive method comparison. The method is compared as sent:
    /// `" OPTIONS"` is not `OPTIONS`.
    pub fn method_is(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }

    /// `Access-Control-Request-Method` sent with a preflight, if any.
    pub fn requested_method(&self) -> Option<&str> {
        self.headers.get("Access-Control-Request-Method")
    }

    /// `Access-Control-Request-Headers` split on commas, trimmed.
    pub fn requested_headers(&self) -> Vec<&str> {
        self.headers
            .get("Access-Control-Request-Headers")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn origin(&self) -> Option<&str> {
        self.headers.get("Origin")
    }
}

impl fmt::Display for InterceptedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = if self.method.is_empty() {
            "<none>"
        } else {
            self.method.as_str()
        };
        write!(f, "{method} {}", self.url)
    }
}
