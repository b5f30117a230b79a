//! In-memory fakes for the network and browser seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::app::{CaptureError, Result};
use crate::fetcher::Fetcher;
use crate::renderer::Renderer;

/// Serves fixed bodies by exact URL; anything else is a 404.
#[derive(Default)]
pub struct FakeFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| CaptureError::ResourceFetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".into(),
            })
    }
}

/// Returns canned HTML per URL; unknown URLs behave like a navigation timeout.
#[derive(Default)]
pub struct FakeRenderer {
    pages: HashMap<String, String>,
    rendered: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Shared flag set once `close` has run.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    /// Shared log of rendered URLs.
    pub fn rendered_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.rendered.clone()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        self.rendered.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| CaptureError::RenderFailure {
                url: url.to_string(),
                reason: "timed out after 30s".into(),
            })
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
