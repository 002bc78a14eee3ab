//! TOML-based configuration system.
//!
//! Loads settings from a `config.toml` file, falling back to defaults. Every
//! struct implements `Default` and is `#[serde(default)]`, so a missing or
//! partial config file behaves like the built-in configuration. In
//! particular the `[preflight]` defaults are the fixed permissive policy.
//!
//! ## Config file search order
//!
//! 1. `CORSBRIDGE_CONFIG` environment variable (explicit override)
//! 2. Next to the executable (`<exe_dir>/config.toml`)
//! 3. Platform config directory (`%APPDATA%\CorsBridge\config.toml` on Windows)
//! 4. Current working directory (`./config.toml`)
//! 5. No file found → `Config::default()`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dispatcher::DetachedBridge;
use crate::host_handler::{DEFAULT_EXTERNAL_SCHEMES, HostHandler};
use crate::preflight::PreflightPolicy;

// ─────────────────────────────────────────────────────────────────────────────
// Config structs
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub bridge: BridgeConfig,
    pub preflight: PreflightPolicy,
    pub host: HostConfig,
    pub webview: WebViewConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub start_url: String,
}

/// Bridge installation toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// `false` leaves the host's handler alone.
    pub enabled: bool,
    /// Per-request `debug!` lines.
    pub log_requests: bool,
}

/// Host shell settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// URL schemes the host opens outside the web view.
    pub external_schemes: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub load_timeout_secs: u64,
}

/// Engine settings applied to the web view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebViewConfig {
    /// User-agent string. Empty = engine default.
    pub user_agent: String,
    /// Maximum layout threads. 0 = auto-detect from CPU count.
    pub layout_threads: i64,
    /// HTTP cache size in bytes.
    pub cache_size: i64,
    pub enforce_tls: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Default impls
// ─────────────────────────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            start_url: "https://localhost/".to_string(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_requests: true,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            external_schemes: DEFAULT_EXTERNAL_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            width: 1024,
            height: 768,
            load_timeout_secs: 30,
        }
    }
}

impl Default for WebViewConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            layout_threads: 0,
            cache_size: 50_000,
            enforce_tls: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config loading and saving
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Loads configuration from a TOML file. Never panics — returns defaults
    /// if no file is found or if parsing fails.
    pub fn load() -> Self {
        match find_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No config file found, using defaults");
                Config::default()
            }
        }
    }

    /// Loads a specific file, with the same fallback rules as [`Config::load`].
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "Configuration loaded");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                    Config::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read config, using defaults");
                Config::default()
            }
        }
    }

    /// Saves configuration to the platform config directory.
    /// Creates the directory if it doesn't exist.
    pub fn save(&self) -> io::Result<()> {
        self.save_to(&save_path())
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, content)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Detached bridge carrying the configured policy and logging switch.
    pub fn detached_bridge(&self) -> DetachedBridge {
        DetachedBridge::new()
            .with_policy(self.preflight.clone())
            .log_requests(self.bridge.log_requests)
    }

    pub fn host_handler(&self) -> HostHandler {
        HostHandler::new(&self.host.external_schemes)
    }
}

/// Searches for a config file in the standard locations.
fn find_config_path() -> Option<PathBuf> {
    // 1. Explicit env var override
    if let Ok(path) = std::env::var("CORSBRIDGE_CONFIG") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
    }

    // 2. Next to the executable
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 3. Platform config directory
    if let Some(dir) = platform_config_dir() {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 4. Current working directory
    let p = PathBuf::from("config.toml");
    if p.is_file() {
        return Some(p);
    }

    None
}

/// Returns the platform-specific save path for the config file.
fn save_path() -> PathBuf {
    platform_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

/// Returns the platform config directory without adding a dependency.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join("CorsBridge"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .or_else(|| std::env::var("HOME").ok().map(|h| format!("{h}/.config")))
            .map(|dir| PathBuf::from(dir).join("corsbridge"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ResourceHandler;
    use crate::request::InterceptedRequest;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.general.start_url, "https://localhost/");
        assert!(c.bridge.enabled);
        assert!(c.bridge.log_requests);
        assert_eq!(c.preflight, PreflightPolicy::default());
        assert_eq!(c.host.width, 1024);
        assert_eq!(c.host.load_timeout_secs, 30);
        assert!(c.host.external_schemes.iter().any(|s| s == "mailto"));
        assert!(c.webview.user_agent.is_empty());
        assert_eq!(c.webview.layout_threads, 0);
        assert!(c.webview.enforce_tls);
    }

    #[test]
    fn test_empty_toml_returns_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.bridge.enabled);
        assert_eq!(config.preflight.max_age_secs, 3600);
        assert_eq!(config.preflight.allow_origin, "*");
    }

    #[test]
    fn test_partial_preflight_section_fills_defaults() {
        let toml = r#"
[preflight]
allow_origin = "https://localhost"
max_age_secs = 600
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.preflight.allow_origin, "https://localhost");
        assert_eq!(config.preflight.max_age_secs, 600);
        assert!(config.preflight.allow_credentials); // default
        assert_eq!(
            config.preflight.allow_methods,
            "GET, POST, PUT, DELETE, OPTIONS, PATCH"
        );
    }

    #[test]
    fn test_bridge_toggles_parse() {
        let toml = r#"
[bridge]
enabled = false
log_requests = false

[host]
external_schemes = ["zoommtg"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.bridge.enabled);
        assert!(!config.bridge.log_requests);
        assert_eq!(config.host.external_schemes, vec!["zoommtg"]);
        assert_eq!(config.host.height, 768); // default
    }

    #[test]
    fn test_full_toml_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.preflight, config.preflight);
        assert_eq!(deserialized.general.start_url, config.general.start_url);
        assert_eq!(deserialized.host.external_schemes, config.host.external_schemes);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/corsbridge/config.toml"));
        assert!(config.bridge.enabled);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir()
            .join(format!("corsbridge-test-{}", std::process::id()))
            .join("config.toml");
        let mut config = Config::default();
        config.preflight.max_age_secs = 120;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.preflight.max_age_secs, 120);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_toml_uses_defaults() {
        let path = std::env::temp_dir().join(format!("corsbridge-bad-{}.toml", std::process::id()));
        fs::write(&path, "[preflight\nmax_age_secs = ").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.preflight, PreflightPolicy::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_detached_bridge_uses_configured_policy() {
        let mut config = Config::default();
        config.preflight.allow_origin = "https://app.local".to_string();
        let bridge = config.detached_bridge().attach(None);
        let response = bridge
            .resource_intercept(&InterceptedRequest::new("OPTIONS", "https://api/x"))
            .unwrap()
            .unwrap();
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("https://app.local"));
    }

    #[test]
    fn test_host_handler_uses_configured_schemes() {
        let mut config = Config::default();
        config.host.external_schemes = vec!["zoommtg".to_string()];
        let host = config.host_handler();
        assert!(host.url_load_decision("zoommtg://join").unwrap());
        assert!(!host.url_load_decision("mailto:a@b").unwrap());
    }

    #[test]
    fn test_save_path_not_empty() {
        let path = save_path();
        assert!(!path.as_os_str().is_empty());
    }
}
