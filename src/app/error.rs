use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Feed unavailable: {url}: {reason}")]
    FeedUnavailable { url: String, reason: String },

    #[error("Render failed for {url}: {reason}")]
    RenderFailure { url: String, reason: String },

    #[error("No <body> in rendered page: {0}")]
    BodyMissing(String),

    #[error("Resource fetch failed for {url}: {reason}")]
    ResourceFetch { url: String, reason: String },

    #[error("Stylesheet parse error: {0}")]
    StylesheetParse(#[from] crate::localizer::css::CssError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Browser(String),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
