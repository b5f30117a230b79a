//! Localization of remote page resources.
//!
//! ```text
//! resource URL + base → resolve → fetch → Store::write_asset → /assets/{owner}_{name}
//! ```
//!
//! - [`AssetLocalizer`]: fetches one resource (or a batch) and stores it
//! - [`StylesheetRewriter`]: localizes the `url(...)` references of a stylesheet
//! - [`AssetRecord`]: per-document filename allocation

pub mod css;
pub mod naming;
pub mod stylesheet;

pub use naming::{AssetKind, AssetRecord};
pub use stylesheet::StylesheetRewriter;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use url::Url;

use crate::app::{CaptureError, Result};
use crate::fetcher::parallel::ParallelFetcher;
use crate::fetcher::Fetcher;
use crate::store::Store;

/// Resolve `resource` against `base`, without its fragment.
///
/// Returns `Ok(None)` for inline `data:` URIs and same-document `#id`
/// references, which never need fetching.
pub fn resolve(resource: &str, base: &Url) -> Result<Option<Url>> {
    let resource = resource.trim();
    if resource.starts_with('#')
        || resource
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
    {
        return Ok(None);
    }
    if resource.is_empty() {
        return Err(CaptureError::ResourceFetch {
            url: resource.to_string(),
            reason: "empty reference".into(),
        });
    }

    let mut url = base.join(resource)?;
    url.set_fragment(None);
    match url.scheme() {
        "http" | "https" => Ok(Some(url)),
        "data" => Ok(None),
        other => Err(CaptureError::ResourceFetch {
            url: url.to_string(),
            reason: format!("unsupported scheme {}", other),
        }),
    }
}

/// `site_path` carrying the `#fragment` of `resource`, if it had one.
///
/// Sprite sheets (`icons.svg#home`) need the fragment to pick their part.
pub fn with_fragment(site_path: String, resource: &str) -> String {
    match resource.trim().split_once('#') {
        Some((_, fragment)) if !fragment.is_empty() => format!("{}#{}", site_path, fragment),
        _ => site_path,
    }
}

/// Downloads resources and writes them to the asset store.
pub struct AssetLocalizer {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    parallel: ParallelFetcher,
    store: Arc<dyn Store + Send + Sync>,
    url_prefix: String,
}

impl AssetLocalizer {
    /// `url_prefix` is the site-absolute asset path, e.g. `/assets`.
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        store: Arc<dyn Store + Send + Sync>,
        url_prefix: impl Into<String>,
        workers: usize,
    ) -> Self {
        let url_prefix: String = url_prefix.into();
        Self {
            parallel: ParallelFetcher::with_workers(fetcher.clone(), workers),
            fetcher,
            store,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one resource and store it.
    ///
    /// `Ok(None)` means nothing to do (`data:` URI or `#id`). Failures are
    /// logged here; callers keep the original reference. The returned path
    /// keeps the reference's fragment.
    pub async fn localize(
        &self,
        resource: &str,
        base: &Url,
        kind: AssetKind,
        record: &AssetRecord,
    ) -> Result<Option<String>> {
        let result = self.localize_inner(resource, base, kind, record).await;
        if let Err(ref e) = result {
            tracing::warn!(url = %resource, kind = %kind, error = %e, "Resource not localized");
        }
        result
    }

    async fn localize_inner(
        &self,
        resource: &str,
        base: &Url,
        kind: AssetKind,
        record: &AssetRecord,
    ) -> Result<Option<String>> {
        let Some(url) = resolve(resource, base)? else {
            return Ok(None);
        };
        let path = match record.localized(&url) {
            Some(path) => path,
            None => {
                let bytes = self.fetch(&url).await?;
                self.persist(&url, kind, record, &bytes)?
            }
        };
        Ok(Some(with_fragment(path, resource)))
    }

    /// Localize several resources of one kind, downloading concurrently.
    ///
    /// Returns original reference → site path for every success.
    pub async fn localize_all(
        &self,
        resources: &[String],
        base: &Url,
        kind: AssetKind,
        record: &AssetRecord,
    ) -> HashMap<String, String> {
        let mut localized = HashMap::new();
        let mut pending: Vec<(String, Url)> = Vec::new();

        for resource in resources {
            match resolve(resource, base) {
                Ok(Some(url)) => match record.localized(&url) {
                    Some(path) => {
                        localized.insert(resource.clone(), with_fragment(path, resource));
                    }
                    None => pending.push((resource.clone(), url)),
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(url = %resource, kind = %kind, error = %e, "Resource not localized")
                }
            }
        }

        let mut seen = HashSet::new();
        let urls: Vec<String> = pending
            .iter()
            .map(|(_, url)| url.to_string())
            .filter(|url| seen.insert(url.clone()))
            .collect();

        let mut fetched: HashMap<String, Result<Vec<u8>>> =
            self.parallel.fetch_all(&urls).await.into_iter().collect();

        for (resource, url) in pending {
            if let Some(path) = record.localized(&url) {
                let path = with_fragment(path, &resource);
                localized.insert(resource, path);
                continue;
            }
            let outcome = match fetched.remove(url.as_str()) {
                Some(Ok(bytes)) => self.persist(&url, kind, record, &bytes),
                Some(Err(e)) => Err(e),
                None => continue,
            };
            match outcome {
                Ok(path) => {
                    let path = with_fragment(path, &resource);
                    localized.insert(resource, path);
                }
                Err(e) => {
                    tracing::warn!(url = %url, kind = %kind, error = %e, "Resource not localized")
                }
            }
        }

        localized
    }

    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self.fetcher.fetch(url.as_str()).await
    }

    /// Write `bytes` under the record's name for `url`; returns the site path.
    pub fn persist(
        &self,
        url: &Url,
        kind: AssetKind,
        record: &AssetRecord,
        bytes: &[u8],
    ) -> Result<String> {
        let filename = record.filename_for(url, kind);
        self.store.write_asset(&filename, bytes)?;

        let site_path = format!("{}/{}", self.url_prefix, filename);
        record.mark_localized(url, &site_path);
        tracing::debug!(url = %url, path = %site_path, "Localized");
        Ok(site_path)
    }
}
