//! The resource/navigation handler capability set.
//!
//! Every object the host can put in its handler slot implements
//! [`ResourceHandler`]: the host's own handler, the CORS bridge, and the
//! no-op [`DefaultHandler`]. Callers only ever see `dyn ResourceHandler`.
//!
//! Methods take `&self`: the host calls them serially on its own thread, and
//! implementations that keep state use `Cell`/`RefCell`.

use thiserror::Error;

use crate::request::InterceptedRequest;
use crate::response::SyntheticResponse;

/// Failure raised by a handler while processing a callback.
///
/// The bridge never produces these itself; it only hands back what the
/// wrapped handler returned.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("request to {url} rejected: {reason}")]
    Rejected { url: String, reason: String },

    #[error("handler I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Capability set of a resource/navigation handler.
///
/// The provided implementations are the base behavior: no interception, no
/// navigation override, notifications ignored.
pub trait ResourceHandler {
    /// `Some(response)` answers the request locally; `None` lets the host
    /// perform the real fetch.
    fn resource_intercept(
        &self,
        _request: &InterceptedRequest,
    ) -> HandlerResult<Option<SyntheticResponse>> {
        Ok(None)
    }

    /// `true` means the handler takes over the navigation to `url` and the
    /// surface must not load it.
    fn url_load_decision(&self, _url: &str) -> HandlerResult<bool> {
        Ok(false)
    }

    fn navigation_started(&self, _url: &str) -> HandlerResult<()> {
        Ok(())
    }

    fn navigation_finished(&self, _url: &str) -> HandlerResult<()> {
        Ok(())
    }

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "handler"
    }

    /// Whether this handler is a CORS bridge. Used to refuse double wrapping.
    fn is_bridge(&self) -> bool {
        false
    }
}

/// Handler with the base behavior only. Stands in for a missing delegate.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl ResourceHandler for DefaultHandler {
    fn name(&self) -> &'static str {
        "default"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_handler_passes_everything() {
        let handler = DefaultHandler;
        let request = InterceptedRequest::new("GET", "https://a/");
        assert!(handler.resource_intercept(&request).unwrap().is_none());
        assert!(!handler.url_load_decision("https://a/").unwrap());
        assert!(handler.navigation_started("https://a/").is_ok());
        assert!(handler.navigation_finished("https://a/").is_ok());
        assert!(!handler.is_bridge());
    }

    #[test]
    fn test_error_messages() {
        let err = HandlerError::Rejected {
            url: "https://a/".to_string(),
            reason: "blocked".to_string(),
        };
        assert_eq!(err.to_string(), "request to https://a/ rejected: blocked");

        let io: HandlerError = std::io::Error::other("disk gone").into();
        assert_eq!(io.to_string(), "handler I/O failed: disk gone");
    }
}
