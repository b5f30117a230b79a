//! Turns one feed entry into one stored document.
//!
//! ```text
//! date filter → ledger → render → <body> → stylesheets → images → write
//! ```

pub mod html;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use url::Url;

use crate::app::{CaptureError, Result};
use crate::assembler::html::PageParts;
use crate::domain::{document_filename, CapturedDocument, FeedEntry};
use crate::localizer::{AssetKind, AssetRecord, StylesheetRewriter};
use crate::renderer::Renderer;
use crate::store::{DedupLedger, Store};

/// Why an entry was passed over without rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Published before the configured start date.
    TooOld,
    /// Source URL is already in the ledger.
    AlreadyCaptured,
    /// Another source URL's document already has this entry's filename.
    FilenameTaken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Captured(PathBuf),
    Skipped(SkipReason),
}

pub struct DocumentAssembler {
    rewriter: StylesheetRewriter,
    store: Arc<dyn Store + Send + Sync>,
    cutoff: DateTime<Utc>,
    layout: String,
}

impl DocumentAssembler {
    pub fn new(
        rewriter: StylesheetRewriter,
        store: Arc<dyn Store + Send + Sync>,
        cutoff: DateTime<Utc>,
        layout: impl Into<String>,
    ) -> Self {
        Self {
            rewriter,
            store,
            cutoff,
            layout: layout.into(),
        }
    }

    /// Process one entry. The source URL is recorded in `ledger` once the
    /// document is on disk.
    pub async fn assemble(
        &self,
        entry: &FeedEntry,
        renderer: &dyn Renderer,
        ledger: &mut DedupLedger,
        now: DateTime<Utc>,
    ) -> Result<EntryOutcome> {
        let published_at = entry.effective_date(now);
        if published_at < self.cutoff {
            return Ok(EntryOutcome::Skipped(SkipReason::TooOld));
        }

        if ledger.is_known(&entry.link) {
            return Ok(EntryOutcome::Skipped(SkipReason::AlreadyCaptured));
        }

        let filename = document_filename(&entry.title, published_at);
        if let Some(owner) = self.store.document_source(&filename)? {
            if owner != entry.link {
                tracing::debug!(url = %entry.link, file = %filename, owner = %owner, "Filename taken");
                return Ok(EntryOutcome::Skipped(SkipReason::FilenameTaken));
            }
        }

        let page_url = Url::parse(&entry.link)?;
        let rendered = renderer.render(&entry.link).await?;
        let parts = html::extract(&rendered, &page_url)
            .ok_or_else(|| CaptureError::BodyMissing(entry.link.clone()))?;

        let record = AssetRecord::new(entry.owner_hash());
        let body_html = self.localize_body(&parts, &record).await;
        let head_links = self.localize_head(&parts, &record).await;

        let document = CapturedDocument {
            title: entry.title.clone(),
            source_url: entry.link.clone(),
            published_at,
            body_html: head_links + &body_html,
        };

        let path = self
            .store
            .write_document(&filename, &document.render(&self.layout))?;
        ledger.record(&entry.link);

        Ok(EntryOutcome::Captured(path))
    }

    /// Localized `<link>` tags for stylesheets declared outside the body.
    ///
    /// A stylesheet that can't be fetched is linked at its absolute remote URL.
    async fn localize_head(&self, parts: &PageParts, record: &AssetRecord) -> String {
        let mut links = String::new();
        for sheet in &parts.head_stylesheets {
            let href = &sheet.href;
            let target = match self.rewriter.localize_stylesheet(href, &parts.base, record).await {
                Ok(Some(local)) => local,
                _ => match parts.base.join(href.trim()) {
                    Ok(remote) => remote.to_string(),
                    Err(_) => continue,
                },
            };
            links.push_str(&html::stylesheet_link(sheet, &target));
            links.push('\n');
        }
        links
    }

    async fn localize_body(&self, parts: &PageParts, record: &AssetRecord) -> String {
        let mut body = parts.body_html.clone();

        for href in &parts.body_stylesheets {
            if let Ok(Some(local)) = self.rewriter.localize_stylesheet(href, &parts.base, record).await {
                body = html::replace_attribute(&body, "href", href, &local);
            }
        }

        for css in &parts.inline_styles {
            let rewritten = self.rewriter.rewrite(css, &parts.base, record).await;
            body = html::replace_style(&body, css, &rewritten);
        }

        let images: HashMap<String, String> = self
            .rewriter
            .localizer()
            .localize_all(&parts.images, &parts.base, AssetKind::Image, record)
            .await;
        for (original, local) in &images {
            body = html::replace_attribute(&body, "src", original, local);
        }
        for srcset in &parts.srcsets {
            let rewritten = html::rewrite_srcset(srcset, &images);
            if &rewritten != srcset {
                body = html::replace_attribute(&body, "srcset", srcset, &rewritten);
            }
        }

        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localizer::AssetLocalizer;
    use crate::store::FsStore;
    use crate::testing::{FakeFetcher, FakeRenderer};
    use chrono::TimeZone;
    use std::fs;

    struct Fixture {
        dir: tempfile::TempDir,
        assembler: DocumentAssembler,
    }

    fn fixture(fetcher: FakeFetcher) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn Store + Send + Sync> =
            Arc::new(FsStore::new(dir.path().join("_posts"), dir.path().join("assets")));
        let localizer = Arc::new(AssetLocalizer::new(Arc::new(fetcher), store.clone(), "/assets", 2));
        let cutoff = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let assembler = DocumentAssembler::new(StylesheetRewriter::new(localizer), store, cutoff, "post");
        Fixture { dir, assembler }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn entry(link: &str) -> FeedEntry {
        FeedEntry::new("Hello world", link).published(Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap())
    }

    const ARTICLE: &str = r#"<html><head>
<link rel="stylesheet" href="/site.css">
<link rel="stylesheet" href="https://cdn.ex.com/down.css">
</head><body><article><p>Story</p><img src="https://ex.com/a.png"><img src="/gone.png"></article></body></html>"#;

    fn article_fetcher() -> FakeFetcher {
        FakeFetcher::new()
            .with("https://ex.com/a.png", b"APNG".to_vec())
            .with("https://ex.com/site.css", b"body { background: url(bg.jpg) }".to_vec())
            .with("https://ex.com/bg.jpg", b"JPEG".to_vec())
    }

    #[tokio::test]
    async fn test_assemble_writes_localized_document() {
        let fx = fixture(article_fetcher());
        let renderer = FakeRenderer::new().with("https://ex.com/story", ARTICLE);
        let mut ledger = DedupLedger::new();
        let e = entry("https://ex.com/story");
        let owner = e.owner_hash();

        let outcome = fx.assembler.assemble(&e, &renderer, &mut ledger, now()).await.unwrap();

        let expected_path = fx.dir.path().join(format!("_posts/2025-03-04-{}.md", owner));
        assert_eq!(outcome, EntryOutcome::Captured(expected_path.clone()));
        assert!(ledger.is_known("https://ex.com/story"));

        let written = fs::read_to_string(&expected_path).unwrap();
        assert!(written.starts_with(
            "---\nlayout: post\ntitle: Hello world\nurl: https://ex.com/story\ndate: 2025-03-04 05:06:07 +0000\n---\n"
        ));
        assert!(written.contains(&format!("<link rel=\"stylesheet\" href=\"/assets/{}_site.css\">", owner)));
        assert!(written.contains("<link rel=\"stylesheet\" href=\"https://cdn.ex.com/down.css\">"));
        assert!(written.contains(&format!("<img src=\"/assets/{}_a.png\">", owner)));
        assert!(written.contains("<img src=\"/gone.png\">"));
        assert!(written.contains("<p>Story</p>"));

        let assets = fx.dir.path().join("assets");
        assert_eq!(fs::read(assets.join(format!("{}_a.png", owner))).unwrap(), b"APNG");
        assert_eq!(fs::read(assets.join(format!("{}_bg.jpg", owner))).unwrap(), b"JPEG");
        assert_eq!(
            fs::read_to_string(assets.join(format!("{}_site.css", owner))).unwrap(),
            format!("body {{ background: url(\"/assets/{}_bg.jpg\") }}", owner)
        );
    }

    #[tokio::test]
    async fn test_old_entry_is_skipped_before_rendering() {
        let fx = fixture(FakeFetcher::new());
        let renderer = FakeRenderer::new().with("https://ex.com/old", ARTICLE);
        let log = renderer.rendered_log();
        let mut ledger = DedupLedger::new();
        let old = FeedEntry::new("Old", "https://ex.com/old")
            .published(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());

        let outcome = fx.assembler.assemble(&old, &renderer, &mut ledger, now()).await.unwrap();

        assert_eq!(outcome, EntryOutcome::Skipped(SkipReason::TooOld));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entry_on_start_date_is_kept() {
        let fx = fixture(FakeFetcher::new());
        let renderer = FakeRenderer::new().with("https://ex.com/edge", "<body><p>x</p></body>");
        let mut ledger = DedupLedger::new();
        let edge = FeedEntry::new("Edge", "https://ex.com/edge")
            .published(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        let outcome = fx.assembler.assemble(&edge, &renderer, &mut ledger, now()).await.unwrap();
        assert!(matches!(outcome, EntryOutcome::Captured(_)));
    }

    #[tokio::test]
    async fn test_undated_entry_uses_now() {
        let fx = fixture(FakeFetcher::new());
        let renderer = FakeRenderer::new().with("https://ex.com/undated", "<body><p>x</p></body>");
        let mut ledger = DedupLedger::new();
        let undated = FeedEntry::new("Undated", "https://ex.com/undated");

        let outcome = fx.assembler.assemble(&undated, &renderer, &mut ledger, now()).await.unwrap();

        let EntryOutcome::Captured(path) = outcome else {
            panic!("expected capture, got {:?}", outcome);
        };
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("2025-06-01-"));
    }

    #[tokio::test]
    async fn test_known_url_is_skipped() {
        let fx = fixture(FakeFetcher::new());
        let renderer = FakeRenderer::new().with("https://ex.com/story", ARTICLE);
        let mut ledger = DedupLedger::new();
        ledger.record("https://ex.com/story");

        let outcome = fx
            .assembler
            .assemble(&entry("https://ex.com/story"), &renderer, &mut ledger, now())
            .await
            .unwrap();

        assert_eq!(outcome, EntryOutcome::Skipped(SkipReason::AlreadyCaptured));
    }

    #[tokio::test]
    async fn test_render_failure_is_error_and_not_recorded() {
        let fx = fixture(FakeFetcher::new());
        let renderer = FakeRenderer::new();
        let mut ledger = DedupLedger::new();

        let result = fx
            .assembler
            .assemble(&entry("https://ex.com/slow"), &renderer, &mut ledger, now())
            .await;

        assert!(matches!(result, Err(CaptureError::RenderFailure { .. })));
        assert!(!ledger.is_known("https://ex.com/slow"));
    }

    #[tokio::test]
    async fn test_missing_body_is_error() {
        let fx = fixture(FakeFetcher::new());
        let renderer = FakeRenderer::new().with("https://ex.com/empty", "<html><body></body></html>");
        let mut ledger = DedupLedger::new();

        let result = fx
            .assembler
            .assemble(&entry("https://ex.com/empty"), &renderer, &mut ledger, now())
            .await;

        assert!(matches!(result, Err(CaptureError::BodyMissing(_))));
        assert!(!fx.dir.path().join("_posts").exists());
    }

    #[tokio::test]
    async fn test_same_filename_for_another_url_is_not_overwritten() {
        let fx = fixture(FakeFetcher::new());
        let renderer = FakeRenderer::new()
            .with("https://ex.com/1", "<body><p>first</p></body>")
            .with("https://ex.com/2", "<body><p>second</p></body>");
        let log = renderer.rendered_log();
        let mut ledger = DedupLedger::new();

        let first = fx.assembler.assemble(&entry("https://ex.com/1"), &renderer, &mut ledger, now()).await.unwrap();
        let second = fx.assembler.assemble(&entry("https://ex.com/2"), &renderer, &mut ledger, now()).await.unwrap();

        let EntryOutcome::Captured(path) = first else {
            panic!("expected capture, got {:?}", first);
        };
        assert_eq!(second, EntryOutcome::Skipped(SkipReason::FilenameTaken));
        assert!(!ledger.is_known("https://ex.com/2"));
        assert_eq!(log.lock().unwrap().len(), 1);
        let written = fs::read_to_string(path).unwrap();
        assert!(written.contains("url: https://ex.com/1\n"));
        assert!(written.contains("<p>first</p>"));
    }

    #[tokio::test]
    async fn test_head_stylesheet_keeps_media_and_alternate_rel() {
        let fx = fixture(
            FakeFetcher::new()
                .with("https://ex.com/print.css", b"p { color: black }".to_vec())
                .with("https://ex.com/alt.css", b"p { color: pink }".to_vec()),
        );
        let html = r#"<html><head><link rel="stylesheet" media="print" href="/print.css"><link rel="alternate stylesheet" title="Pink" href="/alt.css"></head><body><p>x</p></body></html>"#;
        let renderer = FakeRenderer::new().with("https://ex.com/styled", html);
        let mut ledger = DedupLedger::new();
        let e = entry("https://ex.com/styled");
        let owner = e.owner_hash();

        let EntryOutcome::Captured(path) = fx.assembler.assemble(&e, &renderer, &mut ledger, now()).await.unwrap() else {
            panic!("expected capture");
        };

        let written = fs::read_to_string(path).unwrap();
        assert!(written.contains(&format!(
            "<link rel=\"stylesheet\" href=\"/assets/{}_print.css\" media=\"print\">",
            owner
        )));
        assert!(written.contains(&format!(
            "<link rel=\"alternate stylesheet\" href=\"/assets/{}_alt.css\" title=\"Pink\">",
            owner
        )));
    }

    #[tokio::test]
    async fn test_srcset_candidates_are_localized() {
        let fx = fixture(
            FakeFetcher::new()
                .with("https://ex.com/a.png", b"1x".to_vec())
                .with("https://ex.com/a@2x.png", b"2x".to_vec())
                .with("https://ex.com/wide.webp", b"webp".to_vec()),
        );
        let html = r#"<body><picture><source srcset="/wide.webp 1200w"><img src="https://ex.com/a.png" srcset="https://ex.com/a.png 1x, https://ex.com/a@2x.png 2x"></picture></body>"#;
        let renderer = FakeRenderer::new().with("https://ex.com/pics", html);
        let mut ledger = DedupLedger::new();
        let e = entry("https://ex.com/pics");
        let owner = e.owner_hash();

        let EntryOutcome::Captured(path) = fx.assembler.assemble(&e, &renderer, &mut ledger, now()).await.unwrap() else {
            panic!("expected capture");
        };

        let written = fs::read_to_string(path).unwrap();
        assert!(written.contains(&format!("<source srcset=\"/assets/{0}_wide.webp 1200w\">", owner)));
        assert!(written.contains(&format!(
            "<img src=\"/assets/{0}_a.png\" srcset=\"/assets/{0}_a.png 1x, /assets/{0}_a_2x.png 2x\">",
            owner
        )));
        assert!(!written.contains("https://ex.com/a"));
        let assets = fx.dir.path().join("assets");
        assert_eq!(fs::read(assets.join(format!("{}_a_2x.png", owner))).unwrap(), b"2x");
    }

    #[tokio::test]
    async fn test_inline_style_and_body_link_are_rewritten() {
        let fx = fixture(
            FakeFetcher::new()
                .with("https://ex.com/p/dot.gif", b"GIF".to_vec())
                .with("https://ex.com/p/inline.css", b"i { color: red }".to_vec()),
        );
        let html = r#"<body><link rel="stylesheet" href="inline.css"><style>b { background: url(dot.gif) }</style><b>x</b></body>"#;
        let renderer = FakeRenderer::new().with("https://ex.com/p/page", html);
        let mut ledger = DedupLedger::new();
        let e = entry("https://ex.com/p/page");
        let owner = e.owner_hash();

        let outcome = fx.assembler.assemble(&e, &renderer, &mut ledger, now()).await.unwrap();
        let EntryOutcome::Captured(path) = outcome else {
            panic!("expected capture");
        };

        let written = fs::read_to_string(path).unwrap();
        assert!(written.contains(&format!("href=\"/assets/{}_inline.css\"", owner)));
        assert!(written.contains(&format!("b {{ background: url(\"/assets/{}_dot.gif\") }}", owner)));
    }
}
