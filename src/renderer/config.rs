use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the headless browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Navigation timeout in seconds, including the settle wait (default: 30)
    pub timeout_secs: u64,

    /// Wait time after page load for dynamic content in milliseconds (default: 500)
    pub wait_after_load_ms: u64,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// Chrome/Chromium binary; auto-detected when unset
    pub executable: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: 30,
            wait_after_load_ms: 500,
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            executable: None,
        }
    }
}

impl RendererConfig {
    /// Get the navigation timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the wait time after load as a Duration
    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = RendererConfig::default();
        assert!(config.headless);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.wait_after_load_ms, 500);
        assert!(config.user_agent.is_some());
        assert!(config.executable.is_none());
    }

    #[test]
    fn test_durations() {
        let config = RendererConfig {
            timeout_secs: 12,
            wait_after_load_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(12));
        assert_eq!(config.wait_after_load(), Duration::from_millis(250));
    }
}
