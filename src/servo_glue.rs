//! Couche d'intégration entre Servo et le slot de handlers.
//!
//! Ce module contient deux éléments :
//!
//! 1. **[`Waker`] / [`HeadlessEventLoop`]** : le pont `Send + Sync` entre les
//!    threads internes de Servo (Constellation, script, réseau) et la boucle
//!    headless du thread principal.
//!
//! 2. **[`ServoBridge`]** : le `WebViewDelegate` installé sur la WebView. Il ne
//!    prend aucune décision : chaque callback est traduit vers le handler
//!    présent dans le [`HandlerSlot`] au moment de l'appel (le handler de
//!    l'hôte, puis le bridge CORS une fois installé).
//!
//! ## Correspondance des callbacks
//!
//! ```text
//! load_web_resource(load)           → resource_intercept(request)
//!   Some(response)                  → load.intercept(..) + body + finish()
//!   None                            → on lâche `load`, Servo charge normalement
//! request_navigation(request)       → url_load_decision(url)
//!   true                            → deny() (l'hôte gère l'URL)
//!   false                           → allow()
//! notify_load_status_changed(..)
//!   Started                         → navigation_started(url cible)
//!   Complete                        → navigation_finished(url courante)
//! ```
//!
//! À `Started`, `webview.url()` désigne encore l'ancien document. L'URL cible
//! est donc mémorisée en amont : `expect_navigation` (chargement lancé par
//! l'hôte), `request_navigation` autorisée, ou requête main-frame vue dans
//! `load_web_resource`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use servo::{
    LoadStatus, NavigationRequest, WebResourceLoad, WebResourceResponse, WebView, WebViewDelegate,
};
use tracing::{debug, warn};
use url::Url;

use crate::handler::HandlerError;
use crate::install::HandlerSlot;
use crate::request::{Headers, InterceptedRequest};
use crate::response::SyntheticResponse;

// ─────────────────────────────────────────────────────────────────────────────
// Waker : pont threads Servo → boucle headless
// ─────────────────────────────────────────────────────────────────────────────

/// Drapeau + condvar partagés entre le `Waker` et la boucle.
#[derive(Default)]
struct WakeSignal {
    woken: Mutex<bool>,
    condvar: Condvar,
}

/// Boucle d'événements minimale du thread principal.
///
/// Elle dort jusqu'à ce qu'un thread Servo appelle `wake()`, ou au plus
/// `tick` (Servo a aussi besoin d'être tourné sur timer).
#[derive(Clone, Default)]
pub struct HeadlessEventLoop {
    signal: Arc<WakeSignal>,
}

impl HeadlessEventLoop {
    pub fn waker(&self) -> Waker {
        Waker(self.signal.clone())
    }

    /// Attend un réveil puis réarme le drapeau.
    pub fn sleep(&self, tick: Duration) {
        let guard = match self.signal.woken.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut guard = if *guard {
            guard
        } else {
            match self.signal.condvar.wait_timeout(guard, tick) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            }
        };
        *guard = false;
    }
}

/// Pont thread-safe entre les threads internes de Servo et la boucle
/// headless sur le thread principal.
///
/// `Waker` est `Clone + Send + Sync`, ce qu'exige le trait
/// `EventLoopWaker: 'static + Send + Sync`.
#[derive(Clone)]
pub struct Waker(Arc<WakeSignal>);

impl embedder_traits::EventLoopWaker for Waker {
    fn clone_box(&self) -> Box<dyn embedder_traits::EventLoopWaker> {
        Box::new(self.clone())
    }

    fn wake(&self) {
        match self.0.woken.lock() {
            Ok(mut woken) => *woken = true,
            Err(error) => {
                warn!(%error, "Échec du réveil de la boucle headless");
                return;
            }
        }
        self.0.condvar.notify_all();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WebViewDelegate : callbacks Servo → slot de handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Délégué Servo qui route chaque callback vers le handler du slot.
pub struct ServoBridge {
    slot: Rc<HandlerSlot>,
    load_complete: Cell<bool>,
    last_error: RefCell<Option<String>>,
    /// URL de la navigation en cours, avant que Servo ne la valide.
    pending_url: RefCell<Option<Url>>,
}

impl ServoBridge {
    pub fn new(slot: Rc<HandlerSlot>) -> Self {
        Self {
            slot,
            load_complete: Cell::new(false),
            last_error: RefCell::new(None),
            pending_url: RefCell::new(None),
        }
    }

    pub fn slot(&self) -> &Rc<HandlerSlot> {
        &self.slot
    }

    pub fn load_complete(&self) -> bool {
        self.load_complete.get()
    }

    pub fn reset_load(&self) {
        self.load_complete.set(false);
    }

    /// L'hôte annonce l'URL qu'il va charger.
    pub fn expect_navigation(&self, url: &Url) {
        *self.pending_url.borrow_mut() = Some(url.clone());
    }

    /// Dernière erreur remontée par un handler, pour le rapport de l'hôte.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    /// L'hôte journalise l'échec et poursuit comme si rien n'avait été intercepté.
    fn record(&self, callback: &str, error: HandlerError) {
        warn!(callback, %error, "Le handler a échoué");
        *self.last_error.borrow_mut() = Some(error.to_string());
    }
}

impl WebViewDelegate for ServoBridge {
    /// Appelé pour chaque requête réseau émise par Servo.
    ///
    /// Sans réponse synthétique, `load` est simplement lâché et Servo
    /// poursuit le chargement normal.
    fn load_web_resource(&self, _webview: WebView, load: WebResourceLoad) {
        let source = load.request();
        let headers: Headers = source
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let request = InterceptedRequest::new(source.method.as_str(), source.url.as_str())
            .with_headers(headers);
        let url = source.url.clone();
        if source.is_for_main_frame {
            *self.pending_url.borrow_mut() = Some(url.clone());
        }
        let handler = self.slot.handler_or_default();

        let response = match handler.resource_intercept(&request) {
            Ok(Some(response)) => response,
            Ok(None) => return,
            Err(error) => return self.record("resource_intercept", error),
        };

        let Some(servo_response) = to_servo_response(url, &response) else {
            return;
        };

        debug!(%request, status = response.status_code, "Réponse synthétique envoyée");
        let intercepted = load.intercept(servo_response);
        if !response.body.is_empty() {
            intercepted.send_body_data(response.body);
        }
        intercepted.finish();
    }

    /// Demande d'ouverture d'une URL dans la WebView.
    fn request_navigation(&self, _webview: WebView, navigation_request: NavigationRequest) {
        let target = navigation_request.url.clone();
        let external = match self.slot.handler_or_default().url_load_decision(target.as_str()) {
            Ok(claimed) => claimed,
            Err(error) => {
                self.record("url_load_decision", error);
                false
            }
        };
        if external {
            navigation_request.deny();
        } else {
            *self.pending_url.borrow_mut() = Some(target);
            navigation_request.allow();
        }
    }

    fn notify_load_status_changed(&self, webview: WebView, status: LoadStatus) {
        let handler = self.slot.handler_or_default();

        match status {
            LoadStatus::Started => {
                self.load_complete.set(false);
                let url = started_url(self.pending_url.borrow().as_ref(), webview.url().as_ref());
                if let Err(error) = handler.navigation_started(&url) {
                    self.record("navigation_started", error);
                }
            }
            LoadStatus::Complete => {
                self.load_complete.set(true);
                let pending = self.pending_url.borrow_mut().take();
                let url = finished_url(webview.url().as_ref(), pending.as_ref());
                if let Err(error) = handler.navigation_finished(&url) {
                    self.record("navigation_finished", error);
                }
            }
            _ => {}
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────────────────────────────────────

/// URL annoncée à `Started` : la cible mémorisée, sinon le document courant.
fn started_url(pending: Option<&Url>, current: Option<&Url>) -> String {
    pending
        .or(current)
        .map_or_else(|| "about:blank".to_string(), Url::to_string)
}

/// À `Complete`, Servo a validé le document (redirections comprises).
fn finished_url(current: Option<&Url>, pending: Option<&Url>) -> String {
    current
        .or(pending)
        .map_or_else(|| "about:blank".to_string(), Url::to_string)
}

/// `None` si le statut est invalide : la requête repart alors vers le réseau.
fn to_servo_response(url: Url, response: &SyntheticResponse) -> Option<WebResourceResponse> {
    let Ok(status) = StatusCode::from_u16(response.status_code) else {
        warn!(status = response.status_code, "Statut HTTP invalide, réponse ignorée");
        return None;
    };

    Some(
        WebResourceResponse::new(url)
            .headers(to_header_map(response))
            .status_code(status)
            .status_message(response.status_text.clone().into_bytes()),
    )
}

fn to_header_map(response: &SyntheticResponse) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.append(name, value);
            }
            _ => warn!(header = %name, "En-tête invalide ignoré"),
        }
    }
    if !map.contains_key(CONTENT_TYPE)
        && let Ok(value) = HeaderValue::from_str(&response.content_type())
    {
        map.insert(CONTENT_TYPE, value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preflight;

    #[test]
    fn test_header_map_keeps_cors_headers_and_adds_content_type() {
        let response = preflight::classify(&InterceptedRequest::new("OPTIONS", "https://a/"))
            .unwrap();
        let map = to_header_map(&response);
        assert_eq!(map.get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(map.get("access-control-max-age").unwrap(), "3600");
        assert_eq!(map.get(CONTENT_TYPE).unwrap(), "text/plain; charset=UTF-8");
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn test_header_map_skips_invalid_names() {
        let response = SyntheticResponse::new(200, "OK").with_header("bad header", "x");
        let map = to_header_map(&response);
        assert_eq!(map.len(), 1); // Content-Type seul
    }

    #[test]
    fn test_invalid_status_rejected() {
        let url = Url::parse("https://a/").unwrap();
        assert!(to_servo_response(url.clone(), &SyntheticResponse::new(42, "??")).is_none());
        assert!(to_servo_response(url, &SyntheticResponse::new(304, "Not Modified")).is_some());
    }

    #[test]
    fn test_started_url_is_navigation_target() {
        let previous = Url::parse("https://a/").unwrap();
        let target = Url::parse("https://b/").unwrap();
        assert_eq!(started_url(Some(&target), Some(&previous)), "https://b/");
        assert_eq!(started_url(Some(&target), None), "https://b/");
        assert_eq!(started_url(None, Some(&previous)), "https://a/");
        assert_eq!(started_url(None, None), "about:blank");
    }

    #[test]
    fn test_finished_url_prefers_committed_document() {
        let committed = Url::parse("https://b/home").unwrap();
        let target = Url::parse("https://b/").unwrap();
        assert_eq!(finished_url(Some(&committed), Some(&target)), "https://b/home");
        assert_eq!(finished_url(None, Some(&target)), "https://b/");
        assert_eq!(finished_url(None, None), "about:blank");
    }

    #[test]
    fn test_event_loop_wakes() {
        use embedder_traits::EventLoopWaker;

        let event_loop = HeadlessEventLoop::default();
        let waker = event_loop.waker();
        waker.wake();
        // Déjà réveillée : ne doit pas attendre le tick complet.
        let start = std::time::Instant::now();
        event_loop.sleep(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
