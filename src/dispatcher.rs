//! The CORS bridge: preflight short-circuit in front of a wrapped handler.
//!
//! ## Two-phase construction
//!
//! ```text
//! DetachedBridge  →  [attach(previous)]  →  CorsBypassHandler
//! ```
//!
//! A [`DetachedBridge`] holds only the response policy and does not implement
//! [`ResourceHandler`], so the host cannot route a request to it. It becomes a
//! [`CorsBypassHandler`] once the previous slot occupant is known (see
//! [`crate::install`]). The delegate is fixed from then on.
//!
//! ## Per-request flow
//!
//! ```text
//! resource_intercept(request)
//!   ├─ preflight?  → synthesized 200, delegate never called
//!   ├─ delegate?   → delegate.resource_intercept(request), untouched
//!   └─ otherwise   → None (host fetches)
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::handler::{DefaultHandler, HandlerResult, ResourceHandler};
use crate::preflight::{PreflightPolicy, classify_with};
use crate::request::InterceptedRequest;
use crate::response::SyntheticResponse;

/// Bridge that has not captured its delegate yet.
#[derive(Debug, Clone)]
pub struct DetachedBridge {
    policy: PreflightPolicy,
    log_requests: bool,
}

impl DetachedBridge {
    pub fn new() -> Self {
        Self {
            policy: PreflightPolicy::default(),
            log_requests: true,
        }
    }

    pub fn with_policy(mut self, policy: PreflightPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn log_requests(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    /// Captures `delegate` and returns the live handler.
    ///
    /// Consumes the detached bridge: the delegate cannot be changed later.
    pub fn attach(self, delegate: Option<Rc<dyn ResourceHandler>>) -> CorsBypassHandler {
        debug!(
            delegate = delegate.as_ref().map_or("none", |d| d.name()),
            "CORS bridge attached"
        );
        CorsBypassHandler {
            delegate,
            fallback: DefaultHandler,
            policy: self.policy,
            log_requests: self.log_requests,
        }
    }
}

impl Default for DetachedBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Live bridge. Answers preflights, forwards everything else.
pub struct CorsBypassHandler {
    delegate: Option<Rc<dyn ResourceHandler>>,
    fallback: DefaultHandler,
    policy: PreflightPolicy,
    log_requests: bool,
}

impl CorsBypassHandler {
    /// The handler this bridge forwards to, if one was captured.
    pub fn delegate(&self) -> Option<&Rc<dyn ResourceHandler>> {
        self.delegate.as_ref()
    }

    pub fn policy(&self) -> &PreflightPolicy {
        &self.policy
    }

    /// Where non-preflight calls go.
    fn target(&self) -> &dyn ResourceHandler {
        match &self.delegate {
            Some(delegate) => &**delegate,
            None => &self.fallback,
        }
    }
}

impl fmt::Debug for CorsBypassHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorsBypassHandler")
            .field("delegate", &self.delegate.as_ref().map(|d| d.name()))
            .field("policy", &self.policy)
            .field("log_requests", &self.log_requests)
            .finish()
    }
}

impl ResourceHandler for CorsBypassHandler {
    fn resource_intercept(
        &self,
        request: &InterceptedRequest,
    ) -> HandlerResult<Option<SyntheticResponse>> {
        if self.log_requests {
            debug!(method = %request.method(), url = %request.url(), "Intercepting request");
        }

        if let Some(response) = classify_with(&self.policy, request) {
            if self.log_requests {
                debug!(
                    url = %request.url(),
                    origin = request.origin().unwrap_or(""),
                    requested_method = request.requested_method().unwrap_or(""),
                    "Answering preflight locally"
                );
            }
            return Ok(Some(response));
        }

        self.target().resource_intercept(request)
    }

    fn url_load_decision(&self, url: &str) -> HandlerResult<bool> {
        self.target().url_load_decision(url)
    }

    fn navigation_started(&self, url: &str) -> HandlerResult<()> {
        self.target().navigation_started(url)
    }

    fn navigation_finished(&self, url: &str) -> HandlerResult<()> {
        self.target().navigation_finished(url)
    }

    fn name(&self) -> &'static str {
        "cors-bridge"
    }

    fn is_bridge(&self) -> bool {
        true
    }
}
