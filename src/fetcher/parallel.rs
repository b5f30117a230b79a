use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::app::Result;
use crate::fetcher::Fetcher;

/// Fetches a batch of URLs with at most `workers` requests in flight.
pub struct ParallelFetcher {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    semaphore: Arc<Semaphore>,
}

impl ParallelFetcher {
    pub fn with_workers(fetcher: Arc<dyn Fetcher + Send + Sync>, workers: usize) -> Self {
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Results come back in the same order as `urls`.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<(String, Result<Vec<u8>>)> {
        let tasks = urls.iter().map(|url| async move {
            // The semaphore is owned by self and never closed.
            let _permit = self.semaphore.acquire().await.ok();
            let result = self.fetcher.fetch(url).await;
            if let Err(ref e) = result {
                tracing::debug!(url = %url, error = %e, "Fetch failed");
            }
            (url.clone(), result)
        });

        join_all(tasks).await
    }
}
