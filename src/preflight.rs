//! Cross-origin preflight classifier and responder.
//!
//! An `OPTIONS` request issued by the web content cannot be answered by the
//! real backend from inside the embedded surface, so it is answered here,
//! synchronously, with a permissive policy. The actual request that follows
//! goes through the normal pipeline.
//!
//! Classification is a pure function of the request: same input, same bytes
//! out. No allocation depends on the request size.

use serde::{Deserialize, Serialize};

use crate::request::InterceptedRequest;
use crate::response::{SyntheticResponse, headers};

/// The preflight verb.
pub const PREFLIGHT_METHOD: &str = "OPTIONS";

/// Header values emitted on every synthesized preflight response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreflightPolicy {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
    pub allow_credentials: bool,
    pub max_age_secs: u32,
}

impl Default for PreflightPolicy {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS, PATCH".to_string(),
            allow_headers:
                "Content-Type, Authorization, authorization, accessToken, X-Requested-With"
                    .to_string(),
            allow_credentials: true,
            max_age_secs: 3600,
        }
    }
}

impl PreflightPolicy {
    /// Builds the `200 OK` answer for a preflight.
    ///
    /// Header order is fixed: origin, methods, headers, credentials, max-age.
    pub fn respond(&self) -> SyntheticResponse {
        SyntheticResponse::new(200, "OK")
            .with_mime("text/plain", "UTF-8")
            .with_header(headers::ALLOW_ORIGIN, self.allow_origin.as_str())
            .with_header(headers::ALLOW_METHODS, self.allow_methods.as_str())
            .with_header(headers::ALLOW_HEADERS, self.allow_headers.as_str())
            .with_header(headers::ALLOW_CREDENTIALS, self.allow_credentials.to_string())
            .with_header(headers::MAX_AGE, self.max_age_secs.to_string())
    }
}

/// `true` when the request is a cross-origin preflight.
///
/// Only the method decides. A request with an empty method is not a preflight.
pub fn is_preflight(request: &InterceptedRequest) -> bool {
    request.method_is(PREFLIGHT_METHOD)
}

/// Classifies with the built-in permissive policy.
pub fn classify(request: &InterceptedRequest) -> Option<SyntheticResponse> {
    classify_with(&PreflightPolicy::default(), request)
}

/// Classifies with an explicit policy.
pub fn classify_with(
    policy: &PreflightPolicy,
    request: &InterceptedRequest,
) -> Option<SyntheticResponse> {
    is_preflight(request).then(|| policy.respond())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS_URL: &str = "https://api.example.org/v1/items";

    fn expected_headers() -> Vec<(String, String)> {
        [
            ("Access-Control-Allow-Origin", "*"),
            ("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS, PATCH"),
            (
                "Access-Control-Allow-Headers",
                "Content-Type, Authorization, authorization, accessToken, X-Requested-With",
            ),
            ("Access-Control-Allow-Credentials", "true"),
            ("Access-Control-Max-Age", "3600"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_options_any_case_is_preflight() {
        for method in ["OPTIONS", "options", "Options", "oPtIoNs"] {
            let request = InterceptedRequest::new(method, ITEMS_URL);
            let response = classify(&request).expect("preflight must be answered");
            assert_eq!(response.status_code, 200);
            assert_eq!(response.status_text, "OK");
            assert_eq!(response.headers, expected_headers());
        }
    }

    #[test]
    fn test_other_methods_fall_through() {
        for method in [
            "GET", "post", "Patch", "PUT", "DELETE", "HEAD", "OPTION", "", " OPTIONS", "OPTIONS ",
            "OPTIONS\t",
        ] {
            let request = InterceptedRequest::new(method, ITEMS_URL);
            assert!(classify(&request).is_none(), "{method:?} must not be claimed");
        }
    }

    #[test]
    fn test_response_shape() {
        let response = classify(&InterceptedRequest::new("OPTIONS", ITEMS_URL)).unwrap();
        assert_eq!(response.mime_type, "text/plain");
        assert_eq!(response.encoding, "UTF-8");
        assert_eq!(response.content_type(), "text/plain; charset=UTF-8");
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_url_and_headers_do_not_matter() {
        let plain = InterceptedRequest::new("OPTIONS", "file:///android_asset/index.html");
        let noisy = InterceptedRequest::new("OPTIONS", ITEMS_URL)
            .with_header("Origin", "https://localhost")
            .with_header("Access-Control-Request-Method", "DELETE")
            .with_header("Access-Control-Request-Headers", "x-custom");
        assert_eq!(classify(&plain), classify(&noisy));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let request = InterceptedRequest::new("OPTIONS", ITEMS_URL);
        assert_eq!(classify(&request), classify(&request));
    }

    #[test]
    fn test_custom_policy() {
        let policy = PreflightPolicy {
            allow_origin: "https://localhost".to_string(),
            allow_credentials: false,
            max_age_secs: 60,
            ..PreflightPolicy::default()
        };
        let response = classify_with(&policy, &InterceptedRequest::new("OPTIONS", ITEMS_URL))
            .unwrap();
        assert_eq!(response.header("access-control-allow-origin"), Some("https://localhost"));
        assert_eq!(response.header("Access-Control-Allow-Credentials"), Some("false"));
        assert_eq!(response.header("Access-Control-Max-Age"), Some("60"));
    }

    #[test]
    fn test_default_policy_matches_classify() {
        let request = InterceptedRequest::new("OPTIONS", ITEMS_URL);
        assert_eq!(
            classify(&request),
            classify_with(&PreflightPolicy::default(), &request)
        );
    }
}
