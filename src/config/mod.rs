//! Run configuration for feedsnap.
//!
//! Read from a TOML file given with `--config`, or from
//! `~/.config/feedsnap/config.toml`. If the default file doesn't exist, a
//! commented default is written there first.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::renderer::RendererConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed URLs, processed in order.
    pub feeds: Vec<String>,

    /// Entries published before this day (UTC) are skipped.
    pub start_date: NaiveDate,

    /// Root of the generated site. Documents and assets live below it.
    pub site_root: PathBuf,

    /// Document store, relative to `site_root`.
    pub posts_dir: String,

    /// Asset store, relative to `site_root`. Also the URL prefix for assets.
    pub assets_dir: String,

    /// Value of the `layout:` front-matter field.
    pub layout: String,

    pub http: HttpConfig,
    pub renderer: RendererConfig,
}

/// Settings for plain HTTP fetches (feeds, stylesheets, images, fonts).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds (default: 10)
    pub timeout_secs: u64,

    pub user_agent: String,

    /// Images downloaded concurrently for one document (default: 4)
    pub max_concurrent_downloads: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("feedsnap/", env!("CARGO_PKG_VERSION")).to_string(),
            max_concurrent_downloads: 4,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: vec![
                "http://feeds.venturebeat.com/VentureBeat".to_string(),
                "https://www.producthunt.com/feed".to_string(),
            ],
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            site_root: PathBuf::from("."),
            posts_dir: "_posts".to_string(),
            assets_dir: "assets".to_string(),
            layout: "post".to_string(),
            http: HttpConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist. The default path is created with a
    /// commented template when missing. Missing fields use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                }
                p
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/feedsnap/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedsnap").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feeds.is_empty() {
            return Err(ConfigError::Invalid("no feeds configured".into()));
        }

        let assets = Path::new(&self.assets_dir);
        if self.assets_dir.trim_matches('/').is_empty()
            || assets.is_absolute()
            || assets
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ConfigError::Invalid(format!(
                "assets_dir must be a relative path inside site_root, got {:?}",
                self.assets_dir
            )));
        }

        if self.http.max_concurrent_downloads == 0 {
            return Err(ConfigError::Invalid(
                "http.max_concurrent_downloads must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Midnight UTC of `start_date`; the inclusive lower bound for publication dates.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.start_date.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    pub fn posts_path(&self) -> PathBuf {
        self.site_root.join(&self.posts_dir)
    }

    pub fn assets_path(&self) -> PathBuf {
        self.site_root.join(&self.assets_dir)
    }

    /// Site-absolute URL prefix for localized assets, e.g. `/assets`.
    pub fn assets_url_prefix(&self) -> String {
        format!("/{}", self.assets_dir.trim_matches('/'))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# feedsnap configuration

# Feeds to capture, processed in order
feeds = [
    "http://feeds.venturebeat.com/VentureBeat",
    "https://www.producthunt.com/feed",
]

# Entries published before this day are skipped (quoted, YYYY-MM-DD)
start_date = "2025-01-01"

# Site layout: documents go to <site_root>/<posts_dir>,
# assets to <site_root>/<assets_dir> and are linked as /<assets_dir>/<file>
site_root = "."
posts_dir = "_posts"
assets_dir = "assets"

# Front-matter layout name
layout = "post"

[http]
# Per-request timeout in seconds
timeout_secs = 10

# Images downloaded concurrently for one document
max_concurrent_downloads = 4

[renderer]
# Run browser in headless mode (no visible window)
headless = true

# Navigation timeout in seconds
timeout_secs = 30

# Wait time after page load for dynamic content (milliseconds)
wait_after_load_ms = 500

# Path to a Chrome/Chromium binary (default: auto-detect)
# executable = "/usr/bin/chromium"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
