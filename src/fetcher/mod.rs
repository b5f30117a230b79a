pub mod http_fetcher;
pub mod parallel;

use async_trait::async_trait;

use crate::app::Result;

/// HTTP GET capability shared by the feed reader and the asset localizer.
#[async_trait]
pub trait Fetcher {
    /// Fetch `url` and return the response body.
    ///
    /// Network failures, timeouts and non-2xx statuses are all errors.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
