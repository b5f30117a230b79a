use std::sync::Arc;

use crate::app::Result;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::pipeline::Pipeline;
use crate::renderer::ChromeRenderer;
use crate::store::FsStore;

/// Production wiring: reqwest for HTTP, Chrome for rendering, the
/// filesystem for storage.
pub struct AppContext {
    pub config: Config,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub store: Arc<FsStore>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.http)?);
        let store = Arc::new(FsStore::new(config.posts_path(), config.assets_path()));

        Ok(Self {
            config,
            fetcher,
            store,
        })
    }

    /// Start the browser and build a pipeline around it.
    pub async fn launch(self) -> Result<Pipeline> {
        let renderer = ChromeRenderer::launch(self.config.renderer.clone()).await?;

        Ok(Pipeline::with_store(
            &self.config,
            self.fetcher,
            Box::new(renderer),
            self.store,
        ))
    }
}
