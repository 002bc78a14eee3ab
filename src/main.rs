//! Point d'entrée de CorsBridge.
//!
//! Usage :
//!   corsbridge [URL]
//!
//! Exemples :
//!   cargo run --features servo                              → charge `general.start_url`
//!   cargo run --features servo -- http://localhost:8100     → charge l'app locale
//!   RUST_LOG=corsbridge=debug cargo run --features servo    → trace chaque requête interceptée

use std::env;
use std::error::Error;

use corsbridge::config::Config;
use corsbridge::host::HeadlessHost;

fn main() -> Result<(), Box<dyn Error>> {
    // ── 1. Provider crypto TLS ─────────────────────────────────────────
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| "Échec de l'installation du provider crypto rustls")?;

    // ── 2. Logging / Tracing ───────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // ── 3. Configuration ───────────────────────────────────────────────
    let config = Config::load();

    // ── 4. URL : premier argument non-flag, sinon la config ────────────
    let url = env::args()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .unwrap_or_else(|| config.general.start_url.clone());

    // ── 5. Hôte headless + installation du bridge ──────────────────────
    let host = HeadlessHost::new(config)?;
    let report = host.load(&url)?;

    println!(
        "{} chargée en {:.2?} (bridge CORS : {})",
        report.url,
        report.elapsed,
        if report.bridge_installed { "installé" } else { "absent" }
    );
    if let Some(error) = report.handler_error {
        eprintln!("dernière erreur de handler : {error}");
    }

    Ok(())
}
