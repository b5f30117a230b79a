use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::app::{CaptureError, Result};
use crate::renderer::{Renderer, RendererConfig};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Chrome-backed renderer that drives a single page for the whole run.
pub struct ChromeRenderer {
    browser: Browser,
    page: Page,
    handler: Option<JoinHandle<()>>,
    config: RendererConfig,
    closed: bool,
}

impl ChromeRenderer {
    /// Launch the browser and open the page that every render reuses
    pub async fn launch(config: RendererConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer");

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.executable {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder.build().map_err(|e| CaptureError::Browser(format!(
            "Failed to build browser config: {}",
            e
        )))?;

        let (mut browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            CaptureError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler event error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(CaptureError::Browser(format!("Failed to open page: {}", e)));
            }
        };

        if let Some(ref ua) = config.user_agent {
            if let Err(e) = page.set_user_agent(ua).await {
                tracing::warn!("Failed to set user agent: {}", e);
            }
        }

        tracing::info!("Browser launched");

        Ok(Self {
            browser,
            page,
            handler: Some(handler),
            config,
            closed: false,
        })
    }

    async fn navigate(&self, url: &str) -> Result<String> {
        let failure = |reason: String| CaptureError::RenderFailure {
            url: url.to_string(),
            reason,
        };

        self.page
            .goto(url)
            .await
            .map_err(|e| failure(format!("Navigation failed: {}", e)))?;

        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| failure(format!("Navigation failed: {}", e)))?;

        // goto resolves on the load event of the main frame; also wait for
        // readyState in case the page swapped documents afterwards.
        loop {
            let state: String = self
                .page
                .evaluate("document.readyState")
                .await
                .map_err(|e| failure(format!("Script execution failed: {}", e)))?
                .into_value()
                .map_err(|e| failure(format!("Failed to parse result: {:?}", e)))?;

            if state == "complete" {
                break;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }

        // Additional wait for dynamic content
        tokio::time::sleep(self.config.wait_after_load()).await;

        self.page
            .content()
            .await
            .map_err(|e| failure(format!("Failed to read document: {}", e)))
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        match tokio::time::timeout(self.config.timeout(), self.navigate(url)).await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::RenderFailure {
                url: url.to_string(),
                reason: format!("timed out after {}s", self.config.timeout_secs),
            }),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.page.clone().close().await {
            tracing::debug!("Failed to close page: {}", e);
        }

        let result = self.browser.close().await;
        let _ = self.browser.wait().await;

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        tracing::info!("Browser closed");
        result
            .map(|_| ())
            .map_err(|e| CaptureError::Browser(format!("Failed to close browser: {}", e)))
    }
}
