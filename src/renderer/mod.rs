//! Page rendering through a headless browser.
//!
//! ```text
//! entry link → Renderer → rendered HTML → DocumentAssembler
//! ```
//!
//! The browser is abstracted behind [`Renderer`] so the pipeline can be
//! driven by a fake in tests.

mod chrome;
mod config;

pub use chrome::ChromeRenderer;
pub use config::RendererConfig;

use async_trait::async_trait;

use crate::app::Result;

/// Navigation capability: URL in, serialized DOM out.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigate to `url`, wait for the document to settle and return its HTML.
    async fn render(&self, url: &str) -> Result<String>;

    /// Release the browser. Called once at the end of every run.
    async fn close(&mut self) -> Result<()>;
}
