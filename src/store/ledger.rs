use std::collections::HashSet;

use crate::app::Result;
use crate::store::Store;

/// Source URLs already captured, rebuilt from the document store each run.
#[derive(Debug, Default)]
pub struct DedupLedger {
    urls: HashSet<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every stored document's header for its `url:` field.
    pub fn from_store(store: &dyn Store) -> Result<Self> {
        let urls: HashSet<String> = store.source_urls()?.into_iter().collect();
        tracing::info!("Ledger loaded with {} captured URLs", urls.len());
        Ok(Self { urls })
    }

    pub fn is_known(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Takes effect immediately for the rest of the run.
    pub fn record(&mut self, url: &str) {
        self.urls.insert(url.to_string());
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
