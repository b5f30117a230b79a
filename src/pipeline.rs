//! One capture run: feeds → entries → documents.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;

use crate::app::{CaptureError, Result};
use crate::assembler::{DocumentAssembler, EntryOutcome, SkipReason};
use crate::config::Config;
use crate::domain::FeedEntry;
use crate::fetcher::Fetcher;
use crate::localizer::{AssetLocalizer, StylesheetRewriter};
use crate::normalizer::Normalizer;
use crate::renderer::Renderer;
use crate::store::{DedupLedger, FsStore, Store};

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub captured: usize,
    pub skipped_old: usize,
    pub skipped_known: usize,
    pub skipped_collision: usize,
    pub failed: usize,
    pub feeds_failed: usize,
}

pub struct Pipeline {
    feeds: Vec<String>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    renderer: Box<dyn Renderer>,
    store: Arc<dyn Store + Send + Sync>,
    assembler: DocumentAssembler,
}

impl Pipeline {
    /// Pipeline writing to the directories named in `config`.
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        let store = Arc::new(FsStore::new(config.posts_path(), config.assets_path()));
        Self::with_store(config, fetcher, renderer, store)
    }

    pub fn with_store(
        config: &Config,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        renderer: Box<dyn Renderer>,
        store: Arc<dyn Store + Send + Sync>,
    ) -> Self {
        let localizer = Arc::new(AssetLocalizer::new(
            fetcher.clone(),
            store.clone(),
            config.assets_url_prefix(),
            config.http.max_concurrent_downloads,
        ));
        let assembler = DocumentAssembler::new(
            StylesheetRewriter::new(localizer),
            store.clone(),
            config.cutoff(),
            config.layout.clone(),
        );

        Self {
            feeds: config.feeds.clone(),
            fetcher,
            normalizer: Normalizer::new(),
            renderer,
            store,
            assembler,
        }
    }

    /// Fetch and parse one feed.
    pub async fn read_feed(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let body = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| CaptureError::FeedUnavailable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        self.normalizer.normalize(url, &body)
    }

    /// Capture every new entry, then release the renderer.
    ///
    /// Only a failure to read the document store ends the run early; the
    /// renderer is closed in every case.
    pub async fn run(mut self) -> Result<RunSummary> {
        let result = self.capture_all().await;

        if let Err(e) = self.renderer.close().await {
            tracing::warn!("Failed to release renderer: {}", e);
        }

        result
    }

    async fn capture_all(&self) -> Result<RunSummary> {
        let mut ledger = DedupLedger::from_store(self.store.as_ref())?;
        let mut summary = RunSummary::default();

        for feed_url in &self.feeds {
            let entries = match self.read_feed(feed_url).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(feed = %feed_url, reason = %e, "Feed skipped");
                    summary.feeds_failed += 1;
                    continue;
                }
            };
            tracing::info!("Read {} entries from {}", entries.len(), feed_url);

            for entry in &entries {
                self.capture_entry(entry, &mut ledger, &mut summary).await;
            }
        }

        tracing::info!(
            captured = summary.captured,
            skipped_old = summary.skipped_old,
            skipped_known = summary.skipped_known,
            skipped_collision = summary.skipped_collision,
            failed = summary.failed,
            feeds_failed = summary.feeds_failed,
            "Run complete"
        );
        Ok(summary)
    }

    async fn capture_entry(
        &self,
        entry: &FeedEntry,
        ledger: &mut DedupLedger,
        summary: &mut RunSummary,
    ) {
        let attempt = self
            .assembler
            .assemble(entry, self.renderer.as_ref(), ledger, Utc::now());

        match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(Ok(EntryOutcome::Captured(path))) => {
                summary.captured += 1;
                tracing::info!(url = %entry.link, path = %path.display(), "Captured");
            }
            Ok(Ok(EntryOutcome::Skipped(SkipReason::TooOld))) => {
                summary.skipped_old += 1;
                tracing::debug!(url = %entry.link, reason = "before start date", "Skipped");
            }
            Ok(Ok(EntryOutcome::Skipped(SkipReason::AlreadyCaptured))) => {
                summary.skipped_known += 1;
                tracing::debug!(url = %entry.link, reason = "already captured", "Skipped");
            }
            Ok(Ok(EntryOutcome::Skipped(SkipReason::FilenameTaken))) => {
                summary.skipped_collision += 1;
                tracing::warn!(url = %entry.link, reason = "filename taken by another url", "Skipped");
            }
            Ok(Err(e)) => {
                summary.failed += 1;
                tracing::warn!(url = %entry.link, reason = %e, "Entry failed");
            }
            Err(_) => {
                summary.failed += 1;
                tracing::error!(url = %entry.link, reason = "panic", "Entry failed");
            }
        }
    }
}
