use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use url::Url;

use crate::app::{CaptureError, Result};
use crate::localizer::css::{self, RefKind};
use crate::localizer::{resolve, AssetKind, AssetLocalizer, AssetRecord};

/// How many `@import` levels are followed below a linked stylesheet.
pub const MAX_IMPORT_DEPTH: usize = 4;

/// Points the resource references of a stylesheet at local copies.
#[derive(Clone)]
pub struct StylesheetRewriter {
    localizer: Arc<AssetLocalizer>,
}

impl StylesheetRewriter {
    pub fn new(localizer: Arc<AssetLocalizer>) -> Self {
        Self { localizer }
    }

    pub fn localizer(&self) -> &AssetLocalizer {
        &self.localizer
    }

    /// Rewrite `css`, resolving relative references against `base`.
    ///
    /// A stylesheet that fails to parse comes back unchanged. References
    /// that fail to localize keep their original URL.
    pub async fn rewrite(&self, css: &str, base: &Url, record: &AssetRecord) -> String {
        match self.rewrite_at(css, base, record, 0).await {
            Ok(rewritten) => rewritten,
            Err(_) => css.to_string(),
        }
    }

    /// Fetch a stylesheet, rewrite it and store it as an asset.
    ///
    /// Returns the site path of the stored copy, or `Ok(None)` for `data:` URIs.
    pub async fn localize_stylesheet(
        &self,
        resource: &str,
        base: &Url,
        record: &AssetRecord,
    ) -> Result<Option<String>> {
        self.localize_at(resource, base, record, 0).await
    }

    fn rewrite_at<'a>(
        &'a self,
        css: &'a str,
        base: &'a Url,
        record: &'a AssetRecord,
        depth: usize,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let refs = css::find_references(css).map_err(|e| {
                let e = CaptureError::from(e);
                tracing::warn!(base = %base, error = %e, "Unparsable stylesheet left unchanged");
                e
            })?;

            let mut edits = Vec::new();
            for reference in refs {
                let localized = match reference.kind {
                    RefKind::Asset(kind) => {
                        self.localizer
                            .localize(&reference.url, base, kind, record)
                            .await
                    }
                    RefKind::Import if depth < MAX_IMPORT_DEPTH => {
                        self.localize_at(&reference.url, base, record, depth + 1)
                            .await
                    }
                    RefKind::Import => {
                        tracing::debug!(url = %reference.url, "Import nesting too deep, left remote");
                        continue;
                    }
                };

                if let Ok(Some(path)) = localized {
                    edits.push((reference.span, format!("url(\"{}\")", path)));
                }
            }

            Ok(css::splice(css, edits))
        }
        .boxed()
    }

    async fn localize_at(
        &self,
        resource: &str,
        base: &Url,
        record: &AssetRecord,
        depth: usize,
    ) -> Result<Option<String>> {
        let result = self.fetch_and_rewrite(resource, base, record, depth).await;
        if let Err(ref e) = result {
            tracing::warn!(url = %resource, error = %e, "Stylesheet not localized");
        }
        result
    }

    async fn fetch_and_rewrite(
        &self,
        resource: &str,
        base: &Url,
        record: &AssetRecord,
        depth: usize,
    ) -> Result<Option<String>> {
        let Some(url) = resolve(resource, base)? else {
            return Ok(None);
        };
        if let Some(path) = record.localized(&url) {
            return Ok(Some(path));
        }

        let bytes = self.localizer.fetch(&url).await?;
        // Sheets that are not UTF-8 or need no edits are stored byte for byte.
        let rewritten = match std::str::from_utf8(&bytes) {
            // Nested references resolve against the stylesheet's own URL.
            Ok(text) => match self.rewrite_at(text, &url, record, depth).await {
                Ok(out) if out != text => Some(out),
                _ => None,
            },
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Stylesheet is not UTF-8, stored as fetched");
                None
            }
        };
        let stored = rewritten.as_ref().map_or(&bytes[..], |out| out.as_bytes());

        self.localizer
            .persist(&url, AssetKind::Stylesheet, record, stored)
            .map(Some)
    }
}
