//! Servo engine preferences derived from the `[webview]` config section.
//!
//! Thread pools are sized to available CPU cores (clamped) unless the config
//! pins `layout_threads`.

use tracing::info;

use crate::config::WebViewConfig;

/// Builds Servo `Preferences` for the hosted web view.
#[allow(clippy::field_reassign_with_default)]
pub fn build_servo_preferences(config: &WebViewConfig) -> servo::Preferences {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get() as i64)
        .unwrap_or(4);

    let mut prefs = servo::Preferences::default();

    prefs.layout_threads = layout_threads(config.layout_threads, cpus);
    prefs.threadpools_resource_workers_max = cpus.min(8);
    prefs.network_http_cache_size = config.cache_size;
    prefs.network_enforce_tls_enabled = config.enforce_tls;

    if !config.user_agent.is_empty() {
        prefs.user_agent = config.user_agent.clone();
    }

    info!(
        cpus,
        layout_threads = prefs.layout_threads,
        cache_size = prefs.network_http_cache_size,
        tls_enforced = prefs.network_enforce_tls_enabled,
        "Servo preferences configured"
    );

    prefs
}

/// 0 (or negative) means "derive from CPU count", capped at 8.
fn layout_threads(configured: i64, cpus: i64) -> i64 {
    if configured > 0 {
        configured
    } else {
        cpus.clamp(1, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_threads_auto_bounded() {
        assert_eq!(layout_threads(0, 32), 8);
        assert_eq!(layout_threads(0, 2), 2);
        assert_eq!(layout_threads(-1, 0), 1);
    }

    #[test]
    fn test_layout_threads_explicit() {
        assert_eq!(layout_threads(3, 32), 3);
    }

    #[test]
    fn test_preferences_follow_config() {
        let config = WebViewConfig {
            user_agent: "CorsBridge/0.1".to_string(),
            layout_threads: 2,
            cache_size: 1_000,
            enforce_tls: false,
        };
        let prefs = build_servo_preferences(&config);
        assert_eq!(prefs.layout_threads, 2);
        assert_eq!(prefs.network_http_cache_size, 1_000);
        assert!(!prefs.network_enforce_tls_enabled);
        assert_eq!(prefs.user_agent, "CorsBridge/0.1");
    }

    #[test]
    fn test_empty_user_agent_keeps_engine_default() {
        let default_ua = servo::Preferences::default().user_agent;
        let prefs = build_servo_preferences(&WebViewConfig::default());
        assert_eq!(prefs.user_agent, default_ua);
    }
}
