//! Hôte headless : une WebView Servo dont le slot de handlers reçoit le
//! bridge CORS.
//!
//! ## Séquence de démarrage
//!
//! ```text
//! 1. resources::init()                        lecteur de ressources Servo
//! 2. SoftwareRenderingContext                 pas de fenêtre, pas de GPU
//! 3. ServoBuilder … build()                   moteur
//! 4. slot ← HostHandler                       handler de l'hôte
//! 5. WebViewBuilder … delegate(ServoBridge)   WebView vide
//! 6. installer.schedule(slot, queue)          installation différée
//! 7. queue.run_pending()                      setup de l'hôte terminé → bridge installé
//! 8. webview.load(url) + boucle               première requête, bridge déjà en place
//! ```

use std::rc::Rc;
use std::time::{Duration, Instant};

use dpi::PhysicalSize;
use servo::{RenderingContext, Servo, ServoBuilder, SoftwareRenderingContext, WebView, WebViewBuilder};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::install::{BridgeInstaller, HandlerSlot, InstallError, InstallState, TaskQueue};
use crate::preferences::build_servo_preferences;
use crate::resources;
use crate::servo_glue::{HeadlessEventLoop, ServoBridge};

/// Intervalle maximal entre deux tours de la boucle Servo.
const TICK: Duration = Duration::from_millis(5);

#[derive(Debug, Error)]
pub enum HostError {
    #[error("initialisation impossible : {0}")]
    Init(String),

    #[error("URL invalide '{url}' : {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("chargement non terminé après {0} s")]
    Timeout(u64),

    #[error(transparent)]
    Install(#[from] InstallError),
}

/// Résumé d'un chargement, affiché par le binaire.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub url: Url,
    pub bridge_installed: bool,
    pub handler_error: Option<String>,
    pub elapsed: Duration,
}

pub struct HeadlessHost {
    servo: Servo,
    event_loop: HeadlessEventLoop,
    webview: WebView,
    delegate: Rc<ServoBridge>,
    queue: TaskQueue,
    installer: BridgeInstaller,
    config: Config,
}

impl HeadlessHost {
    /// Étapes 1 à 7. Le bridge est installé (si activé) au retour.
    pub fn new(config: Config) -> Result<Self, HostError> {
        resources::init().map_err(|e| HostError::Init(format!("ressources : {e}")))?;

        let event_loop = HeadlessEventLoop::default();

        let size = PhysicalSize::new(config.host.width, config.host.height);
        let rendering_context = Rc::new(
            SoftwareRenderingContext::new(size)
                .map_err(|e| HostError::Init(format!("contexte de rendu : {e:?}")))?,
        );
        rendering_context
            .make_current()
            .map_err(|e| HostError::Init(format!("make_current : {e:?}")))?;

        let servo = ServoBuilder::default()
            .preferences(build_servo_preferences(&config.webview))
            .event_loop_waker(Box::new(event_loop.waker()))
            .build();
        servo.setup_logging();

        let slot = Rc::new(HandlerSlot::with_handler(Rc::new(config.host_handler())));
        let delegate = Rc::new(ServoBridge::new(slot.clone()));

        let webview = WebViewBuilder::new(&servo, rendering_context as Rc<dyn RenderingContext>)
            .delegate(delegate.clone())
            .build();

        let queue = TaskQueue::new();
        let mut installer = BridgeInstaller::new(config.detached_bridge());
        if config.bridge.enabled {
            installer.schedule(&slot, &queue)?;
        } else {
            info!("Bridge CORS désactivé par la configuration");
        }

        // Le setup de l'hôte est terminé : on vide la file avant toute requête.
        queue.run_pending();
        if let InstallState::Failed(error) = installer.state() {
            return Err(error.into());
        }

        Ok(Self {
            servo,
            event_loop,
            webview,
            delegate,
            queue,
            installer,
            config,
        })
    }

    pub fn bridge_installed(&self) -> bool {
        self.installer.is_installed()
    }

    /// Étape 8 : charge `url` et fait tourner la boucle jusqu'à `Complete`.
    pub fn load(&self, url: &str) -> Result<LoadReport, HostError> {
        let url = Url::parse(url).map_err(|source| HostError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let timeout = self.config.host.load_timeout_secs;
        let started = Instant::now();
        let deadline = started + Duration::from_secs(timeout);

        self.delegate.reset_load();
        self.delegate.expect_navigation(&url);
        self.webview.load(url.clone());
        info!(%url, bridge = self.bridge_installed(), "Chargement");

        while !self.delegate.load_complete() {
            if Instant::now() >= deadline {
                warn!(%url, timeout, "Chargement interrompu");
                return Err(HostError::Timeout(timeout));
            }
            self.event_loop.sleep(TICK);
            self.servo.spin_event_loop();
            self.queue.run_pending();
        }

        Ok(LoadReport {
            url,
            bridge_installed: self.bridge_installed(),
            handler_error: self.delegate.last_error(),
            elapsed: started.elapsed(),
        })
    }
}
