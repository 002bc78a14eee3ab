//! # CorsBridge — adaptateur d'interception CORS
//!
//! Décorateur placé devant le pipeline de chargement de ressources d'une
//! WebView embarquée. Il répond localement aux requêtes de preflight
//! cross-origin (`OPTIONS`) et délègue tout le reste, requêtes comme
//! événements de navigation, au handler déjà installé par l'hôte.
//!
//! ## Architecture des modules
//!
//! - [`request`] / [`response`] : vue immuable d'une requête interceptée et
//!   réponse fabriquée localement.
//!
//! - [`preflight`] : classifieur pur. `OPTIONS` (casse ignorée) → `200 OK`
//!   avec les en-têtes `Access-Control-*` permissifs, corps vide.
//!
//! - [`handler`] : trait [`ResourceHandler`], l'ensemble de callbacks commun
//!   à l'hôte, au bridge et au handler no-op [`DefaultHandler`].
//!
//! - [`dispatcher`] : [`CorsBypassHandler`], le bridge lui-même. Construit en
//!   deux phases (`DetachedBridge` → `attach`).
//!
//! - [`install`] : slot de handler de l'hôte, file de tâches mono-thread et
//!   installation différée du bridge.
//!
//! - [`host_handler`] : handler propre à l'hôte (schémas externes, suivi de
//!   navigation), celui que le bridge enveloppe.
//!
//! - [`config`] : configuration TOML.
//!
//! ## Intégration Servo (feature `servo`)
//!
//! - `servo_glue` : `WebViewDelegate` qui traduit les callbacks Servo vers le
//!   slot, et le `Waker` de la boucle headless.
//! - `preferences` / `resources` : préférences moteur et lecteur de ressources.
//! - `host` : hôte headless utilisé par le binaire.

pub mod config;
pub mod dispatcher;
pub mod handler;
pub mod host_handler;
pub mod install;
pub mod preflight;
pub mod request;
pub mod response;

#[cfg(feature = "servo")]
pub mod host;
#[cfg(feature = "servo")]
pub mod preferences;
#[cfg(feature = "servo")]
pub mod resources;
#[cfg(feature = "servo")]
pub mod servo_glue;

pub use dispatcher::{CorsBypassHandler, DetachedBridge};
pub use handler::{DefaultHandler, HandlerError, HandlerResult, ResourceHandler};
pub use install::{BridgeInstaller, HandlerSlot, InstallError, InstallState, TaskQueue};
pub use preflight::{PreflightPolicy, classify, classify_with, is_preflight};
pub use request::{Headers, InterceptedRequest};
pub use response::SyntheticResponse;
