//! The host's own handler, the one the bridge ends up wrapping.
//!
//! It never answers resource requests itself. URL loads with an external
//! scheme (`mailto:`, `tel:`, ...) are claimed so the surface does not try to
//! render them; the host hands them to the platform instead. Navigation
//! notifications are recorded for the host's status display.

use std::cell::RefCell;

use tracing::{debug, info};
use url::Url;

use crate::handler::{HandlerResult, ResourceHandler};

/// Default list of schemes opened outside the web view.
pub const DEFAULT_EXTERNAL_SCHEMES: &[&str] = &["mailto", "tel", "sms", "geo", "market", "intent"];

/// Last navigation event seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    Started(String),
    Finished(String),
}

pub struct HostHandler {
    external_schemes: Vec<String>,
    last_event: RefCell<Option<NavigationEvent>>,
    last_external: RefCell<Option<String>>,
}

impl HostHandler {
    pub fn new<I, S>(external_schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            external_schemes: external_schemes
                .into_iter()
                .map(|s| s.as_ref().to_ascii_lowercase())
                .collect(),
            last_event: RefCell::new(None),
            last_external: RefCell::new(None),
        }
    }

    pub fn last_event(&self) -> Option<NavigationEvent> {
        self.last_event.borrow().clone()
    }

    /// Last URL this handler claimed for the platform.
    pub fn last_external(&self) -> Option<String> {
        self.last_external.borrow().clone()
    }

    fn is_external(&self, url: &str) -> bool {
        // Unparseable URLs are left to the surface.
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        self.external_schemes.iter().any(|s| s == parsed.scheme())
    }
}

impl Default for HostHandler {
    fn default() -> Self {
        Self::new(DEFAULT_EXTERNAL_SCHEMES)
    }
}

impl ResourceHandler for HostHandler {
    fn url_load_decision(&self, url: &str) -> HandlerResult<bool> {
        if self.is_external(url) {
            info!(url, "Opening URL outside the web view");
            *self.last_external.borrow_mut() = Some(url.to_owned());
            return Ok(true);
        }
        Ok(false)
    }

    fn navigation_started(&self, url: &str) -> HandlerResult<()> {
        debug!(url, "Navigation started");
        *self.last_event.borrow_mut() = Some(NavigationEvent::Started(url.to_owned()));
        Ok(())
    }

    fn navigation_finished(&self, url: &str) -> HandlerResult<()> {
        info!(url, "Navigation finished");
        *self.last_event.borrow_mut() = Some(NavigationEvent::Finished(url.to_owned()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "host"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::InterceptedRequest;

    #[test]
    fn test_external_schemes_claimed() {
        let host = HostHandler::default();
        assert!(host.url_load_decision("mailto:team@example.org").unwrap());
        assert_eq!(host.last_external().as_deref(), Some("mailto:team@example.org"));
        assert!(host.url_load_decision("tel:+331234").unwrap());
        // Only the latest claim is kept.
        assert_eq!(host.last_external().as_deref(), Some("tel:+331234"));
    }

    #[test]
    fn test_web_urls_left_to_surface() {
        let host = HostHandler::default();
        assert!(!host.url_load_decision("https://localhost/index.html").unwrap());
        assert!(!host.url_load_decision("not a url").unwrap());
        assert!(host.last_external().is_none());
    }

    #[test]
    fn test_custom_scheme_list_case_folded() {
        let host = HostHandler::new(["ZOOMMTG"]);
        assert!(host.url_load_decision("zoommtg://join?id=1").unwrap());
        assert!(!host.url_load_decision("mailto:a@b").unwrap());
    }

    #[test]
    fn test_never_intercepts_resources() {
        let host = HostHandler::default();
        let request = InterceptedRequest::new("OPTIONS", "https://api/x");
        assert!(host.resource_intercept(&request).unwrap().is_none());
    }

    #[test]
    fn test_navigation_events_recorded() {
        let host = HostHandler::default();
        host.navigation_started("https://a/").unwrap();
        assert_eq!(host.last_event(), Some(NavigationEvent::Started("https://a/".into())));
        host.navigation_finished("https://a/").unwrap();
        assert_eq!(host.last_event(), Some(NavigationEvent::Finished("https://a/".into())));
    }
}
